//! Loader and decoder for `light.mul` light map archives.
//!
//! The archive is a pair of files: `lightidx.mul`, a fixed-count table of
//! index records giving each light's offset and dimensions, and `light.mul`,
//! one intensity byte per pixel. Lights are decoded on first use into
//! 32-bit RGBA bitmaps and cached by identifier.
//!
//! # Components
//!
//! - [`archive`]: index record parsing and random access to the data file
//! - [`EntryTable`]: identifier to record lookup, built once per load
//! - [`decode`](mod@decode): sample expansion and the transparency rule
//! - [`ResourceCache`]: lazily filled texture cache with liveness markers
//! - [`LightsLoader`]: load / get / reset lifecycle
//!
//! # Example
//!
//! ```rust,no_run
//! use lightmul::{LightsConfig, LightsLoader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = LightsLoader::new(LightsConfig::new("/path/to/client"));
//! loader.load().await?;
//!
//! if let Some(light) = loader.get(5) {
//!     println!("light 5 is {}x{}", light.width(), light.height());
//! }
//!
//! loader.reset();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod archive;
pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod table;
pub mod texture;

pub use archive::{ArchiveCursor, ArchiveReader, IndexRecord};
pub use cache::{CacheStats, ResourceCache};
pub use config::LightsConfig;
pub use decode::{PixelBuffer, color16_to_32, decode_run};
pub use error::{LightError, Result};
pub use loader::{LightsLoader, LoadedArchive};
pub use resolver::{DirectoryResolver, PathResolver, ensure_exists};
pub use table::EntryTable;
pub use texture::LightTexture;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of light slots in a standard client's index file.
pub const MAX_LIGHTS_DATA_INDEX_COUNT: usize = 100;

/// Default data file name.
pub const DEFAULT_DATA_FILE: &str = "light.mul";

/// Default index file name.
pub const DEFAULT_INDEX_FILE: &str = "lightidx.mul";
