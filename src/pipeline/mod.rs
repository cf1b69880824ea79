//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one step and consumes only the previous
//! step's complete output. [`crate::convert`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ ocr ──▶ decode + publish ──▶ assemble
//! (paths)     (Mistral) (base64 → PNG → S3)  (page-N.md, all-pages.md)
//! ```
//!
//! 1. [`validate`] — input is a regular file, output is a directory
//! 2. [`ocr`]      — upload the PDF, obtain a signed URL, run OCR
//! 3. [`decode`]   — inline base64 payload → normalised PNG bytes
//! 4. [`publish`]  — upload each PNG under a dated key, build the id → URL map
//! 5. [`assemble`] — merge OCR text with image links and write the files

pub mod assemble;
pub mod decode;
pub mod ocr;
pub mod publish;
pub mod validate;
