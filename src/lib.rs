/*!
Whole-file binary delta encoder producing bsdiff-family patches for
resource-constrained OTA targets, with a Cortex-M4 data-format
preprocessor.

Add dependency to `Cargo.toml` under your project:
```toml
[dependencies]
detools = "0.1"
```

Build commands
--------------

The `detools-create` command can be built with:
```shell
$ cargo build --release --bins --features cmd
$ target/release/detools-create -h
```

Examples
--------

Produce a normal patch with no compression and no data-format
preprocessor:
```rust
use detools::{encode_normal, CompressionKind, EncoderOptions};

fn make_patch(from: &[u8], to: &[u8]) -> detools::Result<Vec<u8>> {
    encode_normal(from, to, CompressionKind::None, None, &EncoderOptions::default())
}
```

Producing an in-place patch additionally requires a memory layout: the
total flash region size and the erase/segment size.
```rust
use detools::{encode_in_place, CompressionKind, EncoderOptions, InPlaceOptions};

fn make_in_place_patch(from: &[u8], to: &[u8]) -> detools::Result<Vec<u8>> {
    let plan = InPlaceOptions::new(1 << 20, 4096);
    encode_in_place(from, to, CompressionKind::None, None, &plan, &EncoderOptions::default())
}
```

This crate only implements the encoder: producing a patch that some
other, typically much smaller, bootloader applies on the target. That
apply/decode path is intentionally out of scope.
*/

/// Default working-set buffer size for the bsdiff search.
pub const BUFFER_SIZE: usize = 16384;

mod bsdiff;
mod cortex_m4;
mod data_format;
mod error;
mod inplace;
mod lcs;
mod sais;
mod size;

pub mod compress;
pub mod container;

pub use bsdiff::EncoderOptions;
pub use compress::CompressionKind;
pub use container::{encode_in_place, encode_normal, PatchType};
pub use cortex_m4::SpanConfig;
pub use data_format::DataFormat;
pub use error::{Error, Result};
pub use inplace::InPlaceOptions;
