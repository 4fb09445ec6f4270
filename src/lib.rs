//! pecha - build annotated pechas from OCR output and editor markup.
//!
//! A pecha is a set of base texts plus layers of annotations whose spans
//! index into those texts by character offset. Two formatters produce them:
//! one for Google Vision OCR responses of scanned pages, one for the tagged
//! HTML written by the pecha editor.

pub mod cli;
pub mod config;
pub mod formatters;
pub mod models;
pub mod provider;
pub mod services;
pub mod storage;
