//! CSV reports.
//!
//! A report is a serializable row type registered with `define_report!`. Each
//! registered type gets its own file under the configured output directory,
//! named `<prefix><short_name>.csv`, and every `send_report` call appends one
//! row to it.
use std::any::TypeId;
use std::cell::RefCell;
use std::env;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::Writer;
use log::trace;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::ModelError;
use crate::hashing::HashMap;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(&self, writer: &mut csv::Writer<std::fs::File>) -> Result<(), csv::Error> {
                writer.serialize(self)
            }
        }
    };
}
pub use define_report;

/// Where report files are written and whether existing files may be replaced.
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl ReportOptions {
    /// Creates options with an empty prefix, the current directory, and
    /// overwriting disabled.
    #[must_use]
    pub fn new() -> Self {
        ReportOptions {
            file_prefix: String::new(),
            directory: env::current_dir().unwrap_or_default(),
            overwrite: false,
        }
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ReportOptions,
}

define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
        config: ReportOptions::new(),
    }
);

pub trait ContextReportExt {
    /// Returns the report options for this context, to be configured before
    /// reports are added.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Opens the file for report type `T` and writes its header on the first row.
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists and overwriting is off, if
    /// `T` already has a file, or if the file cannot be created.
    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), ModelError>;

    /// Whether a file has been opened for report type `T`.
    fn has_report<T: Report>(&self) -> bool;

    /// Writes one row to the file of report type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` was not added with `add_report`, or if writing fails.
    fn send_report<T: Report>(&self, report: T);
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_mut(ReportPlugin).config
    }

    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), ModelError> {
        let data_container = self.get_data_mut(ReportPlugin);
        if data_container
            .file_writers
            .get_mut()
            .contains_key(&TypeId::of::<T>())
        {
            return Err(ModelError::ReportError(format!(
                "A report has already been added for {short_name}"
            )));
        }

        let options = &data_container.config;
        let path = options
            .directory
            .join(format!("{}{short_name}.csv", options.file_prefix));
        if path.exists() && !options.overwrite {
            return Err(ModelError::ReportError(format!(
                "File already exists: {}. Enable overwriting to replace it.",
                path.display()
            )));
        }
        create_dir_all(&options.directory)?;
        trace!("adding report {}", path.display());
        let file = File::create(&path)?;

        data_container
            .file_writers
            .get_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn has_report<T: Report>(&self) -> bool {
        self.get_data(ReportPlugin).is_some_and(|data_container| {
            data_container
                .file_writers
                .borrow()
                .contains_key(&TypeId::of::<T>())
        })
    }

    fn send_report<T: Report>(&self, report: T) {
        let data_container = self
            .get_data(ReportPlugin)
            .expect("No writer found for the report type");
        let mut writers = data_container.file_writers.borrow_mut();
        let writer = writers
            .get_mut(&report.type_id())
            .expect("No writer found for the report type");
        report.serialize(writer).expect("Failed to write report row");
        writer.flush().expect("Failed to flush report writer");
    }
}
