//! Invoicr turns the contents of an invoice form into a PDF document: a header with the client,
//! a table with one row per line item and the total of all the subtotals.
//!
//! The form is kept in an `InvoiceForm`, which coerces the raw input of the user into numbers.
//! Every generation works on an `InvoiceRequest` snapshot of the form, which the `InvoiceBuilder`
//! lays out onto a rendering surface and serializes, so that the same snapshot always produces
//! the same bytes. The resulting `InvoiceDocument` is then handed over to a `Delivery`.

/// The layout of an invoice onto a rendering surface.
///
/// # Introduction
///
/// The `InvoiceBuilder` is the core of this crate. Its `build` method validates the request, lays it
/// out onto a `PdfSurface` and returns the serialized document together with its suggested file name.
/// The layout is computed in a single pass with fixed positions: the logo, the title and the client
/// on top of the first page, then the table header and one row per item, and finally the total line.
/// Rows which do not fit above the bottom margin continue on a new page, which repeats the table header.
///
/// A logo which cannot be decoded is skipped with a warning, every other failure aborts the generation.
pub mod builder;

/// The configuration of the generated documents, read from a camelCase JSON file in which every
/// field is optional.
pub mod configuration;

/// Where the generated documents go once they are ready.
pub mod delivery;

/// This module contains the `ContextError` type, which carries a context message and the message of
/// the propagated source error, and the `InvoiceError` enum which tells the kinds of failure apart.
///
/// Only `ResourceFetch` errors are recovered inside this crate (the logo is left out), the other kinds
/// are always returned to the caller, which can expect an explanation of what went wrong.
pub mod error;

/// Metrics and encodings of the built-in PDF fonts, plus the embedding of TrueType fonts.
pub mod fonts;

/// The mutable state of the invoice form and the coercion of its raw input.
pub mod form;

/// The data model: line items, requests and the generated documents.
pub mod invoice;

/// Logo references, the fetching of their bytes and the decoding of the images.
pub mod logo;

/// Currency and quantity text, rounded to whole cents, and the suggested file names.
pub mod money;

/// The `PdfSurface` rendering surface, which produces PDF documents through `lopdf`.
///
/// Documents are deterministic: the identifier in the trailer is derived from the contents of the
/// request and the creation date comes from the configuration, so that generating twice from the
/// same snapshot gives byte-identical files which can be compared in tests.
pub mod pdf;

/// The capabilities a rendering backend offers to the layout.
pub mod surface;

/// The `TranscriptSurface` rendering surface, which records every draw call as a line of text.
///
/// It has no fonts of its own and measures text with the built-in Helvetica metrics, so that
/// layouts can be checked in tests and from the command line without parsing a PDF back.
pub mod transcript;
