//! Binary save state.
//!
//! Layout: the particle array, then the color array, then the transform
//! array. Each block is a little-endian `u64` byte length followed by the raw
//! in-memory bytes of the array. There is no header or version; records are
//! native-endian, so a snapshot only loads on the same architecture.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::{Result, SandboxError};
use crate::particle::{Color, Particle};
use crate::store::ParticleStore;

fn write_block<W: Write, T: Pod>(writer: &mut W, items: &[T]) -> Result<()> {
    let bytes: &[u8] = bytemuck::cast_slice(items);
    writer.write_all(&(bytes.len() as u64).to_le_bytes())?;
    writer.write_all(bytes)?;
    Ok(())
}

fn read_block<R: Read, T: Pod>(reader: &mut R, what: &str) -> Result<Vec<T>> {
    let mut len = [0u8; 8];
    reader.read_exact(&mut len)?;
    let len = u64::from_le_bytes(len);

    let record = std::mem::size_of::<T>() as u64;
    if len % record != 0 {
        return Err(SandboxError::CorruptSnapshot(format!(
            "{what} block is {len} bytes, not a multiple of {record}"
        )));
    }

    let mut bytes = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(SandboxError::CorruptSnapshot(format!(
            "{what} block truncated: expected {len} bytes, found {}",
            bytes.len()
        )));
    }
    // copy into a typed buffer; the byte vector carries no alignment guarantee
    let mut out = vec![T::zeroed(); (len / record) as usize];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&bytes);
    Ok(out)
}

pub fn write_snapshot<W: Write>(writer: &mut W, store: &ParticleStore) -> Result<()> {
    write_block(writer, store.particles())?;
    write_block(writer, store.colors())?;
    write_block(writer, store.transforms())?;
    Ok(())
}

pub struct Snapshot {
    pub particles: Vec<Particle>,
    pub colors: Vec<Color>,
    pub transforms: Vec<Mat4>,
}

pub fn read_snapshot<R: Read>(reader: &mut R) -> Result<Snapshot> {
    let particles: Vec<Particle> = read_block(reader, "particle")?;
    let colors: Vec<Color> = read_block(reader, "color")?;
    let transforms: Vec<Mat4> = read_block(reader, "transform")?;

    if colors.len() != particles.len() || transforms.len() != particles.len() {
        return Err(SandboxError::CorruptSnapshot(format!(
            "array lengths disagree: {} particles, {} colors, {} transforms",
            particles.len(),
            colors.len(),
            transforms.len()
        )));
    }
    if let Some((i, p)) = particles.iter().enumerate().find(|(i, p)| p.index() != *i) {
        return Err(SandboxError::CorruptSnapshot(format!(
            "particle at index {i} carries id {}",
            p.id
        )));
    }
    Ok(Snapshot { particles, colors, transforms })
}

impl Snapshot {
    pub fn apply(self, store: &mut ParticleStore) {
        store.restore(self.particles, self.colors, self.transforms);
    }
}

pub fn save<P: AsRef<Path>>(path: P, store: &ParticleStore) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_snapshot(&mut writer, store)?;
    writer.flush()?;
    log::info!("Saved {} particles to {:?}", store.len(), path.as_ref());
    Ok(())
}

pub fn load<P: AsRef<Path>>(path: P, store: &mut ParticleStore) -> Result<()> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let snapshot = read_snapshot(&mut reader)?;
    log::info!("Loaded {} particles from {:?}", snapshot.particles.len(), path.as_ref());
    snapshot.apply(store);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnConfig;
    use glam::Vec2;

    fn populated() -> ParticleStore {
        let mut store = ParticleStore::new(SpawnConfig {
            random_velocity: true,
            seed: Some(11),
            ..SpawnConfig::default()
        });
        store.scatter(25, 4.0, Vec2::new(400.0, 300.0));
        store.particles_mut()[3].torque = -0.75;
        store.refresh_render_data(0.1);
        store
    }

    #[test]
    fn round_trip_is_bit_identical() {
        let store = populated();
        let mut bytes = Vec::new();
        write_snapshot(&mut bytes, &store).unwrap();

        let mut restored = ParticleStore::new(SpawnConfig::default());
        read_snapshot(&mut bytes.as_slice()).unwrap().apply(&mut restored);

        let raw = |s: &ParticleStore| bytemuck::cast_slice::<Particle, u8>(s.particles()).to_vec();
        assert_eq!(raw(&restored), raw(&store));
        assert_eq!(restored.colors(), store.colors());
        assert_eq!(restored.transforms(), store.transforms());
        assert!(restored.spin().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn block_prefix_is_byte_length() {
        let store = populated();
        let mut bytes = Vec::new();
        write_snapshot(&mut bytes, &store).unwrap();
        let len = u64::from_le_bytes(bytes[..8].try_into().unwrap());
        assert_eq!(len as usize, 25 * std::mem::size_of::<Particle>());
    }

    #[test]
    fn truncated_snapshot_is_rejected() {
        let store = populated();
        let mut bytes = Vec::new();
        write_snapshot(&mut bytes, &store).unwrap();
        bytes.truncate(bytes.len() - 10);
        assert!(matches!(
            read_snapshot(&mut bytes.as_slice()),
            Err(SandboxError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut bytes = Vec::new();
        write_block(&mut bytes, &[Particle::new(0, Vec2::ZERO, 1.0, 1.0)]).unwrap();
        write_block::<_, Color>(&mut bytes, &[]).unwrap();
        write_block::<_, Mat4>(&mut bytes, &[]).unwrap();
        assert!(read_snapshot(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn reads_from_unaligned_buffer() {
        let store = populated();
        let mut bytes = vec![0xAB];
        write_snapshot(&mut bytes, &store).unwrap();

        let snapshot = read_snapshot(&mut &bytes[1..]).unwrap();
        assert_eq!(snapshot.particles, store.particles());
        assert_eq!(snapshot.transforms, store.transforms());
    }
}
