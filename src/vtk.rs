use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::particle::{Color, Particle};

fn write_scalars<W: Write>(writer: &mut W, name: &str, values: impl Iterator<Item = f32>) -> std::io::Result<()> {
    writeln!(writer, "SCALARS {} float 1", name)?;
    writeln!(writer, "LOOKUP_TABLE default")?;
    for value in values {
        writeln!(writer, "{}", value)?;
    }
    Ok(())
}

/// Writes one frame as ASCII legacy VTK polydata. Points sit in the z = 0
/// plane; velocity, radius, torque, id and color ride along as point data.
pub fn write_frame<W: Write>(writer: &mut W, particles: &[Particle], colors: &[Color]) -> std::io::Result<()> {
    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "Particle sandbox frame")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET POLYDATA")?;

    writeln!(writer, "POINTS {} float", particles.len())?;
    for p in particles {
        writeln!(writer, "{} {} 0", p.pos.x, p.pos.y)?;
    }

    writeln!(writer, "POINT_DATA {}", particles.len())?;

    writeln!(writer, "VECTORS velocity float")?;
    for p in particles {
        writeln!(writer, "{} {} 0", p.vel.x, p.vel.y)?;
    }

    write_scalars(writer, "radius", particles.iter().map(|p| p.radius))?;
    write_scalars(writer, "torque", particles.iter().map(|p| p.torque))?;

    writeln!(writer, "SCALARS id int 1")?;
    writeln!(writer, "LOOKUP_TABLE default")?;
    for p in particles {
        writeln!(writer, "{}", p.id)?;
    }

    if colors.len() == particles.len() {
        writeln!(writer, "COLOR_SCALARS color 4")?;
        for c in colors {
            writeln!(writer, "{} {} {} {}", c.r, c.g, c.b, c.a)?;
        }
    }

    Ok(())
}

pub fn write_vtk<P: AsRef<Path>>(path: P, particles: &[Particle], colors: &[Color]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_frame(&mut writer, particles, colors)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn frame_has_one_line_per_point() {
        let particles = [
            Particle::new(0, Vec2::new(1.0, 2.0), 3.0, 1.0),
            Particle::new(1, Vec2::new(4.0, 5.0), 6.0, 1.0),
        ];
        let mut out = Vec::new();
        write_frame(&mut out, &particles, &[Color::WHITE; 2]).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("POINTS 2 float\n1 2 0\n4 5 0\n"));
        assert!(text.contains("SCALARS radius float 1\nLOOKUP_TABLE default\n3\n6\n"));
        assert!(text.contains("COLOR_SCALARS color 4\n1 1 1 1\n"));
    }
}
