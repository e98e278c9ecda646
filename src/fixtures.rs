//! Fixture documents and resolution.
//!
//! ```rust
//! use seedling::fixtures::kv::KvFixtureDocument;
//! use seedling::{FixtureResolver, MemorySource, ResolveContext};
//!
//! let source = MemorySource::new()
//!     .with_document("cache", "databases:\n  0:\n    keys:\n      values:\n        greeting: hello\n");
//! let mut ctx = ResolveContext::new();
//! let mut resolver = FixtureResolver::<KvFixtureDocument, _>::new(&source);
//! let fixture = resolver.resolve(&mut ctx, "cache").unwrap();
//! assert_eq!(fixture.databases[&0].record_count(), 1);
//! ```

pub use seedling_fixtures::*;
