//! Read / write flat arrays as raw little-endian binary.
//!
//! Files are stored in the conventional caller order (slice-major for
//! images, (slice, angle, bin) for sinograms); the typed helpers below
//! convert to and from the engine's internal layouts on the way through.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::grid::Grid;
use crate::image::Image;
use crate::sinogram::Sinogram;

pub fn write(data: impl Iterator<Item = f32>, path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);
    for datum in data {
        buf.write_all(&datum.to_le_bytes())?;
    }
    Ok(())
}

type IORes<T> = std::io::Result<T>;

pub fn read<'a>(path: &Path) -> IORes<impl Iterator<Item = IORes<f32>> + 'a> {
    let file = File::open(path)?;
    let mut buf = BufReader::new(file);
    let mut buffer = [0; 4];

    Ok(std::iter::from_fn(move || {
        use std::io::ErrorKind::UnexpectedEof;
        match buf.read_exact(&mut buffer) {
            Ok(()) => Some(Ok(f32::from_le_bytes(buffer))),
            Err(e) if e.kind() == UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

/// Read a raw `u32` array, e.g. a sinogram bin mask.
pub fn read_u32<'a>(path: &Path) -> IORes<impl Iterator<Item = IORes<u32>> + 'a> {
    let file = File::open(path)?;
    let mut buf = BufReader::new(file);
    let mut buffer = [0; 4];

    Ok(std::iter::from_fn(move || {
        use std::io::ErrorKind::UnexpectedEof;
        match buf.read_exact(&mut buffer) {
            Ok(()) => Some(Ok(u32::from_le_bytes(buffer))),
            Err(e) if e.kind() == UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

// --------------- typed wrappers with layout conversion ----------------------

fn expect_len<T>(data: Vec<T>, expected: usize, what: &str, path: &Path)
                 -> std::io::Result<Vec<T>> {
    if data.len() != expected {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{what} `{}` holds {} values, expected {expected}",
                    path.display(), data.len()),
        ));
    }
    Ok(data)
}

pub fn read_image(grid: Grid, path: &Path) -> std::io::Result<Image> {
    let data: Vec<f32> = read(path)?.collect::<Result<_, _>>()?;
    let data = expect_len(data, grid.num_voxels(), "image file", path)?;
    let mut image = Image::empty(grid);
    image.copy_image(&data);
    Ok(image)
}

pub fn write_image(image: &Image, path: &Path) -> std::io::Result<()> {
    let mut caller = vec![0.0; image.grid.num_voxels()];
    image.read_image(&mut caller);
    write(caller.into_iter(), path)
}

pub fn read_sinogram(bins: usize, angles: usize, slices: usize, bin_width: f32,
                     path: &Path) -> std::io::Result<Sinogram> {
    let data: Vec<f32> = read(path)?.collect::<Result<_, _>>()?;
    let data = expect_len(data, bins * angles * slices, "sinogram file", path)?;
    let mut sinogram = Sinogram::new(bins, angles, slices, bin_width);
    sinogram.copy_proj(&data);
    Ok(sinogram)
}

pub fn write_sinogram(sinogram: &Sinogram, path: &Path) -> std::io::Result<()> {
    let mut caller = vec![0.0; sinogram.len()];
    sinogram.read_proj(&mut caller);
    write(caller.into_iter(), path)
}

/// Read a bin mask and convert it to the engine's sinogram layout.
pub fn read_mask(bins: usize, angles: usize, slices: usize, path: &Path)
                 -> std::io::Result<Vec<u32>> {
    let data: Vec<u32> = read_u32(path)?.collect::<Result<_, _>>()?;
    let data = expect_len(data, bins * angles * slices, "mask file", path)?;
    let mut mask = vec![0; data.len()];
    for s in 0..slices {
        for a in 0..angles {
            for b in 0..bins {
                mask[(a * bins + b) * slices + s] = data[(s * angles + a) * bins + b];
            }
        }
    }
    Ok(mask)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raw_io_roundtrip() -> std::io::Result<()> {
        use tempfile::tempdir;
        #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

        // Harmless temporary location for output file
        let dir = tempdir()?;
        let file_path = dir.path().join("test.bin");

        // Some test data
        let original_data = vec![1.23, 4.56, 7.89];

        // Write data to file
        write(original_data.iter().copied(), &file_path)?;

        // Read data back from file
        let reloaded_data: Vec<_> = read(&file_path)?
            .collect::<Result<_, _>>()?;

        // Check that roundtrip didn't corrupt the data
        assert_eq!(original_data, reloaded_data);
        Ok(())
    }

    #[test]
    fn image_roundtrip_preserves_caller_order() -> std::io::Result<()> {
        use tempfile::tempdir;
        #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

        let dir = tempdir()?;
        let file_path = dir.path().join("image.raw");

        let grid = Grid::new(3, 2, 1.0);
        let caller_data: Vec<f32> = (0..grid.num_voxels()).map(|i| i as f32).collect();
        write(caller_data.iter().copied(), &file_path)?;

        let image = read_image(grid, &file_path)?;
        // Slice 1, row 2, col 0 in caller order: (1*3 + 2)*3 + 0 = 15
        assert_eq!(image[[2, 0, 1]], 15.0);

        let out_path = dir.path().join("image-out.raw");
        write_image(&image, &out_path)?;
        let reloaded: Vec<f32> = read(&out_path)?.collect::<Result<_, _>>()?;
        assert_eq!(caller_data, reloaded);
        Ok(())
    }

    #[test]
    fn short_image_file_is_invalid_data() {
        use tempfile::tempdir;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("short.raw");
        write([1.0, 2.0].into_iter(), &file_path).unwrap();

        let err = read_image(Grid::new(4, 4, 1.0), &file_path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
