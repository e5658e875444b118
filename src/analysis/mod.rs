//! Pure analysis passes run over crawled content
//!
//! - `color`: palette tags and average color of a button image
//! - `text`: stemmed keyword frequencies of page text

mod color;
mod text;

pub use color::{
    analyze_image, analyze_pixels, nearest_palette_index, ColorProfile, BLACK_AND_WHITE, PALETTE,
    RAINBOW,
};
pub use text::{embedding_text, keyword_frequencies};
