use crate::error::VisualizationError;
use crate::lattice::{Lattice, Spin};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// An 8 bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Color of an up spin.
    pub const UP: Rgb = Rgb(255, 255, 255);
    /// Color of a down spin.
    pub const DOWN: Rgb = Rgb(0, 50, 200);

    /// Color of a spin.
    pub fn for_spin(spin: Spin) -> Self {
        if spin == 1 {
            Self::UP
        } else {
            Self::DOWN
        }
    }

    /// The spin a color encodes, if any.
    pub fn to_spin(self) -> Option<Spin> {
        match self {
            Self::UP => Some(1),
            Self::DOWN => Some(-1),
            _ => None,
        }
    }
}

/// A read-only colored picture of a lattice, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LatticeSnapshot {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl LatticeSnapshot {
    /// Color every site of a lattice.
    pub fn from_lattice(lattice: &Lattice) -> Self {
        Self {
            width: lattice.size(),
            height: lattice.size(),
            pixels: lattice
                .iter()
                .map(|(_, _, spin)| Rgb::for_spin(spin))
                .collect(),
        }
    }

    /// Wrap raw pixels, checking they fill the dimensions.
    pub fn from_pixels(
        width: usize,
        height: usize,
        pixels: Vec<Rgb>,
    ) -> Result<Self, VisualizationError> {
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(VisualizationError::Dimensions {
                width,
                height,
                found: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Decode the colors back into row-major spins.
    pub fn to_spins(&self) -> Result<Vec<Spin>, VisualizationError> {
        self.pixels
            .iter()
            .enumerate()
            .map(|(index, color)| {
                color
                    .to_spin()
                    .ok_or(VisualizationError::UnknownColor {
                        index,
                        color: (color.0, color.1, color.2),
                    })
            })
            .collect()
    }

    /// Decode back into a lattice.
    pub fn to_lattice(&self) -> Result<Lattice, VisualizationError> {
        if self.width != self.height {
            return Err(VisualizationError::NotSquare {
                width: self.width,
                height: self.height,
            });
        }
        let spins = self.to_spins()?;
        // Decoded spins are always valid, only the shape can be wrong.
        Lattice::from_spins(self.width, &spins).map_err(|_| VisualizationError::Dimensions {
            width: self.width,
            height: self.height,
            found: spins.len(),
        })
    }
}
