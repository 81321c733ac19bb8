//! PDF layout options and color palettes
//!
//! A [`PdfStyle`] is what a saved template stores: one flat record of
//! rendering options.

use serde::{Deserialize, Serialize};

/// RGB color, 0-255 per channel
pub type Rgb = (u8, u8, u8);

/// Base visual template
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BaseTemplate {
    /// Classic teal with a timing gutter next to lesson phases
    #[default]
    Teal,
    /// Professional dark blue
    Pro,
    /// Modern study style with check-mark bullets
    Study,
}

impl BaseTemplate {
    /// Label shown in the UI
    pub fn label(&self) -> &'static str {
        match self {
            Self::Teal => "Classique (Teal + Gutter)",
            Self::Pro => "Professionnel",
            Self::Study => "Moderne",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Teal => Palette {
                primary: (0, 128, 128),
                secondary: (255, 127, 80),
                accent: (255, 127, 80),
                text: (0, 0, 0),
                bg_light: (245, 245, 245),
                gutter_bg: Some((255, 192, 0)),
            },
            Self::Pro => Palette {
                primary: (34, 49, 63),
                secondary: (69, 170, 242),
                accent: (46, 204, 113),
                text: (51, 51, 51),
                bg_light: (245, 245, 245),
                gutter_bg: None,
            },
            Self::Study => Palette {
                primary: (44, 62, 80),
                secondary: (243, 156, 18),
                accent: (231, 76, 60),
                text: (51, 51, 51),
                bg_light: (236, 240, 241),
                gutter_bg: None,
            },
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Teal, Self::Pro, Self::Study]
    }
}

// Unknown template names fall back to teal instead of failing the load.
fn lenient_template<'de, D>(deserializer: D) -> Result<BaseTemplate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(match name.to_ascii_lowercase().as_str() {
        "pro" => BaseTemplate::Pro,
        "study" => BaseTemplate::Study,
        _ => BaseTemplate::Teal,
    })
}

/// Colors used by a base template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub accent: Rgb,
    pub text: Rgb,
    pub bg_light: Rgb,
    /// Background of the phase-duration gutter (teal only)
    pub gutter_bg: Option<Rgb>,
}

/// Paper size
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    /// Portrait width and height in millimetres
    pub fn size_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
        }
    }
}

/// Page orientation, serialized as `P` / `L`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    #[serde(rename = "P")]
    Portrait,
    #[serde(rename = "L")]
    Landscape,
}

/// Page margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 15.0,
            right: 15.0,
            top: 20.0,
        }
    }
}

// Stored as a `[left, right, top]` triple.
impl Serialize for Margins {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.left, self.right, self.top].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Margins {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [left, right, top] = <[f32; 3]>::deserialize(deserializer)?;
        Ok(Self { left, right, top })
    }
}

pub const MARGIN_RANGE: (f32, f32) = (5.0, 50.0);
pub const FONT_SIZE_RANGE: (f32, f32) = (9.0, 16.0);
pub const LINE_SPACING_RANGE: (f32, f32) = (0.9, 1.6);

/// Rendering options for one exported sheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PdfStyle {
    #[serde(deserialize_with = "lenient_template")]
    pub base_template: BaseTemplate,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    pub margins: Margins,
    pub base_font_size: f32,
    pub line_spacing: f32,
    pub show_cover: bool,
    pub watermark_text: String,
}

impl Default for PdfStyle {
    fn default() -> Self {
        Self {
            base_template: BaseTemplate::Teal,
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            base_font_size: 12.0,
            line_spacing: 1.15,
            show_cover: false,
            watermark_text: String::new(),
        }
    }
}

impl PdfStyle {
    /// Clamp numeric options into the ranges the UI offers and trim the
    /// watermark.
    pub fn normalized(mut self) -> Self {
        let clamp = |v: f32, (lo, hi): (f32, f32), fallback: f32| {
            if v.is_finite() {
                v.clamp(lo, hi)
            } else {
                fallback
            }
        };
        let defaults = Margins::default();
        self.margins = Margins {
            left: clamp(self.margins.left, MARGIN_RANGE, defaults.left),
            right: clamp(self.margins.right, MARGIN_RANGE, defaults.right),
            top: clamp(self.margins.top, MARGIN_RANGE, defaults.top),
        };
        self.base_font_size = clamp(self.base_font_size, FONT_SIZE_RANGE, 12.0);
        self.line_spacing = clamp(self.line_spacing, LINE_SPACING_RANGE, 1.15);
        self.watermark_text = self.watermark_text.trim().to_string();
        self
    }

    /// Page width and height in millimetres, orientation applied
    pub fn page_size_mm(&self) -> (f32, f32) {
        let (w, h) = self.page_format.size_mm();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn palette(&self) -> Palette {
        self.base_template.palette()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_serialize_flat() {
        let json = serde_json::to_value(PdfStyle::default()).unwrap();
        assert_eq!(json["base_template"], "teal");
        assert_eq!(json["page_format"], "A4");
        assert_eq!(json["orientation"], "P");
        assert_eq!(json["margins"], serde_json::json!([15.0, 15.0, 20.0]));
        assert_eq!(json["show_cover"], false);
    }

    #[test]
    fn test_partial_record_uses_defaults() {
        let style: PdfStyle =
            serde_json::from_str(r#"{"base_template": "study", "orientation": "L"}"#).unwrap();
        assert_eq!(style.base_template, BaseTemplate::Study);
        assert_eq!(style.orientation, Orientation::Landscape);
        assert_eq!(style.margins, Margins::default());
        assert_eq!(style.base_font_size, 12.0);
    }

    #[test]
    fn test_unknown_template_falls_back_to_teal() {
        let style: PdfStyle = serde_json::from_str(r#"{"base_template": "neon"}"#).unwrap();
        assert_eq!(style.base_template, BaseTemplate::Teal);
    }

    #[test]
    fn test_normalized_clamps() {
        let style = PdfStyle {
            margins: Margins {
                left: 1.0,
                right: 80.0,
                top: 20.0,
            },
            base_font_size: 30.0,
            line_spacing: f32::NAN,
            watermark_text: "  Brouillon  ".to_string(),
            ..PdfStyle::default()
        }
        .normalized();

        assert_eq!(style.margins.left, 5.0);
        assert_eq!(style.margins.right, 50.0);
        assert_eq!(style.base_font_size, 16.0);
        assert_eq!(style.line_spacing, 1.15);
        assert_eq!(style.watermark_text, "Brouillon");
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let style = PdfStyle {
            orientation: Orientation::Landscape,
            ..PdfStyle::default()
        };
        assert_eq!(style.page_size_mm(), (297.0, 210.0));
    }

    #[test]
    fn test_only_teal_has_gutter() {
        assert!(BaseTemplate::Teal.palette().gutter_bg.is_some());
        assert!(BaseTemplate::Pro.palette().gutter_bg.is_none());
        assert!(BaseTemplate::Study.palette().gutter_bg.is_none());
    }
}
