use crate::exports::{Intensityf32, Lengthf32};

/// Line-integral measurements indexed by (bin, angle, slice).
///
/// Internal layout is angle-major with the axial slice fastest:
/// `(angle * bins + bin) * slices + slice`, so one angular view is a single
/// contiguous span and shares its inner axial stride with [`crate::Image`].
/// Callers exchange data through [`Sinogram::copy_proj`] /
/// [`Sinogram::read_proj`], which convert from/to the conventional
/// (slice, angle, bin) file order.
#[derive(Clone)]
pub struct Sinogram {
    pub bins: usize,
    pub angles: usize,
    pub slices: usize,
    pub bin_width: Lengthf32,
    pub data: Vec<Intensityf32>,
}

impl Sinogram {

    pub fn new(bins: usize, angles: usize, slices: usize, bin_width: Lengthf32) -> Self {
        assert!(bins > 0 && angles > 0 && slices > 0,
                "Sinogram dimensions must be non-zero");
        assert!(bin_width > 0.0, "Sinogram bin width must be positive");
        Self { bins, angles, slices, bin_width, data: vec![0.0; bins * angles * slices] }
    }

    pub fn with_data(bins: usize, angles: usize, slices: usize, bin_width: Lengthf32,
                     data: Vec<Intensityf32>) -> Self {
        assert_eq!(data.len(), bins * angles * slices,
                   "Sinogram data does not match dimensions ({bins} {angles} {slices})");
        Self { bins, angles, slices, bin_width, data }
    }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Size of one angular view: all bins of all slices for a single angle.
    pub fn view_len(&self) -> usize { self.bins * self.slices }

    /// One full angular view, laid out as `bin * slices + slice`.
    #[inline]
    pub fn view(&self, angle: usize) -> &[Intensityf32] {
        let v = self.view_len();
        &self.data[angle * v..(angle + 1) * v]
    }

    #[inline]
    pub fn view_mut(&mut self, angle: usize) -> &mut [Intensityf32] {
        let v = self.view_len();
        &mut self.data[angle * v..(angle + 1) * v]
    }

    /// Lateral offset of a detector bin from the scanner axis.
    #[inline]
    pub fn bin_offset(&self, bin: usize) -> Lengthf32 {
        (bin as Lengthf32 - self.bins as Lengthf32 / 2.0 + 0.5) * self.bin_width
    }

    /// Bulk transfer from a caller buffer in (slice, angle, bin) order into
    /// the internal layout.
    pub fn copy_proj(&mut self, caller: &[Intensityf32]) {
        assert_eq!(caller.len(), self.data.len(),
                   "Caller sinogram buffer does not match dimensions");
        let (nb, na, ns) = (self.bins, self.angles, self.slices);
        for s in 0..ns {
            for a in 0..na {
                for b in 0..nb {
                    self.data[(a * nb + b) * ns + s] = caller[(s * na + a) * nb + b];
                }
            }
        }
    }

    /// Bulk transfer into a caller buffer in (slice, angle, bin) order; the
    /// inverse of [`Sinogram::copy_proj`].
    pub fn read_proj(&self, caller: &mut [Intensityf32]) {
        assert_eq!(caller.len(), self.data.len(),
                   "Caller sinogram buffer does not match dimensions");
        let (nb, na, ns) = (self.bins, self.angles, self.slices);
        for s in 0..ns {
            for a in 0..na {
                for b in 0..nb {
                    caller[(s * na + a) * nb + b] = self.data[(a * nb + b) * ns + s];
                }
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use float_eq::assert_float_eq;
    use rstest::rstest;

    #[rstest(/**/ bins, bin   , expected,
             case( 4  , 0     , -1.5),
             case( 4  , 3     ,  1.5),
             case( 1  , 0     ,  0.0),
             case( 5  , 2     ,  0.0),
    )]
    fn bin_offsets_are_centred(bins: usize, bin: usize, expected: Lengthf32) {
        let sino = Sinogram::new(bins, 1, 1, 1.0);
        assert_float_eq!(sino.bin_offset(bin), expected, ulps <= 1);
    }

    #[test]
    fn views_partition_the_data() {
        let mut sino = Sinogram::new(3, 4, 2, 1.0);
        for a in 0..4 {
            sino.view_mut(a).fill(a as Intensityf32);
        }
        assert!(sino.view(2).iter().all(|&x| x == 2.0));
        assert_eq!(sino.data.iter().sum::<f32>(), (0 + 1 + 2 + 3) as f32 * 6.0);
    }

    #[test]
    fn copy_then_read_roundtrips() {
        let mut sino = Sinogram::new(3, 2, 4, 1.0);
        let original: Vec<_> = (0..sino.len()).map(|i| i as Intensityf32).collect();
        sino.copy_proj(&original);
        // Caller offset of (slice 3, angle 1, bin 2): (3*2 + 1)*3 + 2 = 23
        assert_eq!(sino.view(1)[2 * 4 + 3], 23.0);
        let mut back = vec![0.0; sino.len()];
        sino.read_proj(&mut back);
        assert_eq!(original, back);
    }
}
