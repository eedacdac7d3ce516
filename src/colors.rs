//! Global colors.

use nu_ansi_term::Color;

/// The attention color.
pub(crate) const ATTENTION_COLOR: Color = Color::Red;

/// The color used to colorise versions, variants and package names.
pub(crate) const INFO_COLOR: Color = Color::Cyan;

/// The color used to colorise the path.
pub(crate) const PATH_COLOR: Color = Color::LightBlue;

/// The color used to colorise URLs.
pub(crate) const URL_COLOR: Color = Color::LightPurple;
