//! Bundled example projects

use rf_core::{Bpm, RfResult, TimeSignature};
use rf_spatial::{Motion, MoveParams, OrbitParams, Position3D, RandomParams, Segment, SpiralParams};

use crate::{AudioClip, Node, Project};

fn node(name: &str, layout_index: u32, color: u32, file: &str, duration_secs: f64) -> RfResult<Node> {
    let mut node = Node::new(name, layout_index);
    node.color = color;
    node.add_clip(AudioClip::new(file, "mp3", 0.0, duration_secs)?);
    Ok(node)
}

fn jump(x: f32, y: f32, z: f32) -> RfResult<Segment> {
    let params = MoveParams::new(Position3D::new(x, y, z), false)?;
    Ok(Segment::new(0.0, 240.0, Motion::Move(params))?)
}

/// Seven-piece band: static placements, a spiral, an orbiting rhythm
/// section and a jittering piano
pub fn example_band() -> RfResult<Project> {
    let mut project = Project::new("Example Project 1");
    project.bpm = Bpm::new(73)?;
    project.time_signature = TimeSignature::FourFour;

    let mut sax = node("Saxophone", 0, 0x00A1D8, "Saxophone", 29.58902494331066)?;
    sax.set_volume(0.3)?;
    sax.insert_segment(Segment::new(
        60.0,
        2100.0,
        Motion::Spiral(SpiralParams::new(37.0, 0.0, 32.0, 5.0)?),
    )?);

    let mut bass = node("Bass", 1, 0x0161FE, "Bass", 39.45204081632653)?;
    bass.insert_segment(jump(27.0, 7.0, 50.0)?);

    let mut drums = node("Drums", 2, 0x4C22B2, "Drums", 36.16437641723356)?;
    drums.insert_segment(jump(-27.0, 7.0, 50.0)?);

    let mut piano = node("Piano", 3, 0x982ABD, "Piano", 39.45204081632653)?;
    piano.set_volume(0.2)?;
    piano.insert_segment(Segment::new(
        0.0,
        2160.0,
        Motion::Random(RandomParams::new(24.0, 10, 0x5EED_0003)?),
    )?);

    let mut organ1 = node("Organ1", 4, 0xB92D5D, "Organ1", 39.45204081632653)?;
    organ1.insert_segment(jump(-40.0, 10.0, -50.0)?);

    let mut organ2 = node("Organ2", 5, 0xFF4014, "Organ2", 32.87671201814059)?;
    organ2.insert_segment(jump(40.0, 10.0, -50.0)?);

    let mut rhythm = node("Rhythm", 6, 0xFF6A00, "Rhythm", 39.45204081632653)?;
    let orbit = Motion::Orbit(OrbitParams::new(30.0, 30.0, 1.0, 5.0)?);
    for start in [0.0, 960.0, 1920.0] {
        rhythm.insert_segment(Segment::new(start, 960.0, orbit)?);
    }

    for n in [sax, bass, drums, piano, organ1, organ2, rhythm] {
        project.insert_node(n);
    }
    Ok(project)
}

/// Solo guitar walking through every motion kind
pub fn example_guitar() -> RfResult<Project> {
    let mut project = Project::new("Example Project 2");
    project.bpm = Bpm::new(134)?;
    project.time_signature = TimeSignature::FourFour;

    let mut guitar = node("Guitar", 0, 0x00A1D8, "Simple-Guitar", 37.61195011337868)?;
    let glide = MoveParams::new(Position3D::new(-43.0, 33.0, -27.0), true)?;
    guitar.insert_segment(Segment::new(0.0, 720.0, Motion::Move(glide))?);
    guitar.insert_segment(Segment::new(
        960.0,
        1050.0,
        Motion::Orbit(OrbitParams::new(40.0, 18.342_777, 2.0, 8.0)?),
    )?);
    guitar.insert_segment(Segment::new(
        2160.0,
        960.0,
        Motion::Random(RandomParams::new(38.0, 8, 0x5EED_0004)?),
    )?);
    guitar.insert_segment(Segment::new(
        3360.0,
        960.0,
        Motion::Spiral(SpiralParams::new(40.0, 1.0, 40.0, 3.0)?),
    )?);

    project.insert_node(guitar);
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_are_valid() {
        let band = example_band().unwrap();
        band.validate().unwrap();
        assert_eq!(band.nodes().len(), 7);
        assert_eq!(band.node_by_name("Rhythm").unwrap().segments().len(), 3);

        let guitar = example_guitar().unwrap();
        guitar.validate().unwrap();
        let starts: Vec<f64> = guitar.nodes()[0].segments().iter().map(|s| s.start()).collect();
        assert_eq!(starts, vec![3360.0, 2160.0, 960.0, 0.0]);
    }
}
