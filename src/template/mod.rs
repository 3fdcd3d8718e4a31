//! Reference pose templates.
//!
//! A template is a PNG whose opaque pixels are painted in a handful of flat
//! marker colors. Each color marks where a body part of a correctly posed
//! user should project. Transparent pixels carry no information and are left
//! out of the index.
//!
//! Decoding is a pure function of the PNG bytes ([`PixelIndex::decode`]), so
//! templates can be built and tested without any rendering surface.

/// Fetching templates by path and caching decoded results
pub mod loader;

/// Static zone configuration per pose type
pub mod zones;

use crate::{Error, Result};
use image::ImageFormat;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use loader::{FsTemplateSource, MemoryTemplateSource, TemplateCache, TemplateSource};
pub use zones::{PoseKind, ValidationZone, FRONT_POSE_ZONES, SIDE_POSE_ZONES};

/// Opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Channel sum, used to order colors from dark to bright
    #[must_use]
    pub fn brightness(self) -> u16 {
        self.0.iter().map(|&c| u16::from(c)).sum()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0[0], self.0[1], self.0[2])
    }
}

/// A template pixel location paired with its marker color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelColorMatch {
    pub x: u32,
    pub y: u32,
    pub color: Rgb,
}

/// Dense coordinate → color index of a decoded template.
/// `None` marks a fully transparent pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelIndex {
    width: u32,
    height: u32,
    pixels: Vec<Option<Rgb>>,
}

impl PixelIndex {
    /// Decode PNG bytes into a pixel index.
    ///
    /// # Errors
    ///
    /// Returns `Error::Image` if the bytes are not a valid PNG and
    /// `Error::InvalidInput` for an empty image.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput("Template image has zero size".to_string()));
        }

        let pixels = rgba
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                (a > 0).then_some(Rgb::new(r, g, b))
            })
            .collect();

        Ok(Self { width, height, pixels })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color at integer coordinates, if the pixel exists and is opaque
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Iterate all opaque pixels in row-major order
    #[allow(clippy::cast_possible_truncation)] // bounded by u32 dimensions
    pub fn iter(&self) -> impl Iterator<Item = PixelColorMatch> + '_ {
        let width = self.width as usize;
        self.pixels.iter().enumerate().filter_map(move |(i, px)| {
            px.map(|color| PixelColorMatch {
                x: (i % width) as u32,
                y: (i / width) as u32,
                color,
            })
        })
    }

    /// Number of opaque pixels
    #[must_use]
    pub fn opaque_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_some()).count()
    }
}

/// A decoded reference template together with its validation zones
#[derive(Debug, Clone)]
pub struct PoseTemplate {
    index: PixelIndex,
    zones: Vec<ValidationZone>,
    pixel_zones: BTreeMap<&'static str, BTreeSet<PixelColorMatch>>,
}

impl PoseTemplate {
    /// Build a template from a decoded index and the zones of its pose type
    #[must_use]
    pub fn new(index: PixelIndex, zones: &[ValidationZone]) -> Self {
        let pixel_zones = zones
            .iter()
            .map(|zone| {
                let members = index
                    .iter()
                    .filter(|px| zone.accepts(px.color))
                    .collect::<BTreeSet<_>>();
                (zone.name, members)
            })
            .collect();

        Self {
            index,
            zones: zones.to_vec(),
            pixel_zones,
        }
    }

    /// Decode PNG bytes and build the template in one step
    ///
    /// # Errors
    ///
    /// See [`PixelIndex::decode`]
    pub fn decode(bytes: &[u8], zones: &[ValidationZone]) -> Result<Self> {
        Ok(Self::new(PixelIndex::decode(bytes)?, zones))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.index.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.index.height()
    }

    #[must_use]
    pub fn zones(&self) -> &[ValidationZone] {
        &self.zones
    }

    #[must_use]
    pub fn index(&self) -> &PixelIndex {
        &self.index
    }

    /// Color at template coordinates, rounded to the nearest pixel
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked
    pub fn pixel_color_at(&self, x: f64, y: f64) -> Option<Rgb> {
        let (width, height) = (f64::from(self.width()), f64::from(self.height()));
        if !(x >= 0.0 && y >= 0.0 && x < width && y < height) {
            return None;
        }
        // [w - 0.5, w) rounds onto the next column
        let (rx, ry) = (x.round(), y.round());
        if rx >= width || ry >= height {
            return None;
        }
        self.index.get(rx as u32, ry as u32)
    }

    /// All pixels whose color matches any accepted color of the named zone
    #[must_use]
    pub fn zone_coordinates(&self, zone_name: &str) -> Option<&BTreeSet<PixelColorMatch>> {
        self.pixel_zones.get(zone_name)
    }

    /// Zone name → pixel set, for every configured zone
    #[must_use]
    pub fn pixel_zones(&self) -> &BTreeMap<&'static str, BTreeSet<PixelColorMatch>> {
        &self.pixel_zones
    }

    /// All opaque pixels of exactly this color
    #[must_use]
    pub fn pixels_by_color(&self, color: Rgb) -> Vec<PixelColorMatch> {
        self.index.iter().filter(|px| px.color == color).collect()
    }

    /// Distinct colors present in the template, darkest first
    #[must_use]
    pub fn unique_colors(&self) -> Vec<Rgb> {
        let mut colors: Vec<Rgb> = self
            .index
            .iter()
            .map(|px| px.color)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        colors.sort_by_key(|c| (c.brightness(), *c));
        colors
    }

    /// Number of opaque pixels
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.index.opaque_count()
    }
}

#[cfg(test)]
pub(crate) mod test_png {
    use crate::testing::encode_png;
    use image::{Rgba, RgbaImage};

    /// 4x3 image: top row shoulder marker, middle row hip, bottom transparent
    pub fn sample() -> Vec<u8> {
        let mut img = RgbaImage::new(4, 3);
        for x in 0..4 {
            img.put_pixel(x, 0, Rgba([1, 1, 1, 255]));
            img.put_pixel(x, 1, Rgba([4, 4, 4, 255]));
            img.put_pixel(x, 2, Rgba([9, 9, 9, 0]));
        }
        img.put_pixel(3, 1, Rgba([3, 3, 3, 10]));
        encode_png(&img).unwrap()
    }
}
