//! CSV report files.
//!
//! A report is a serializable row type registered with [`define_report!`]. Each report type is
//! written to its own file, `<directory>/<file_prefix><short_name>.csv`, with a header taken from
//! the row type's field names.
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::{debug, trace};

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::EpiError;

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

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::csv::Error> {
                writer.serialize(self)
            }
        }
    };
}
pub use define_report;

/// Where report files go and what happens to files already there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl ReportOptions {
    #[must_use]
    pub fn new() -> ReportOptions {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }

    /// Sets the prefix of every report file name.
    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    /// Sets the directory report files are created in. It is created if needed.
    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    /// Whether existing report files are replaced rather than treated as an error.
    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }

    /// The path of the file for the report named `short_name`.
    #[must_use]
    pub fn file_path(&self, short_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{short_name}.csv", self.file_prefix))
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

// Registers a data container that stores
// * file_writers: Maps report type to file writer
// * config: Contains all the customizable filename options that the user supplies
define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::new()),
        config: ReportOptions::new(),
    }
);

// Creates the report file and any missing parent directories.
fn create_report_file(path: &Path, overwrite: bool) -> Result<File, EpiError> {
    if path.exists() && !overwrite {
        return Err(EpiError::ReportError(format!(
            "file already exists: {}. Please set `overwrite` to true in the file configuration \
             and rerun.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

pub trait ContextReportExt {
    /// Returns the report options so they can be changed before reports are added.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Creates the file for report type `T`, named after `short_name` and the report options.
    ///
    /// # Errors
    /// Returns an `EpiError` if the file exists and overwriting is off, or if it can't be
    /// created.
    fn add_report<T: Report + 'static>(&mut self, short_name: &str) -> Result<(), EpiError>;

    /// Writes `report` as a row of the file registered for its type.
    ///
    /// # Errors
    /// Returns `EpiError::ReportError` if no file was added for the report type, or a CSV error
    /// if the row can't be written.
    fn send_report<T: Report>(&self, report: T) -> Result<(), EpiError>;

    /// Flushes every report file.
    ///
    /// # Errors
    /// Returns an `EpiError` if a file can't be written.
    fn flush_reports(&self) -> Result<(), EpiError>;
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_container_mut(ReportPlugin).config
    }

    fn add_report<T: Report + 'static>(&mut self, short_name: &str) -> Result<(), EpiError> {
        let data_container = self.get_data_container_mut(ReportPlugin);
        let path = data_container.config.file_path(short_name);
        let file = create_report_file(&path, data_container.config.overwrite)?;
        debug!("writing {short_name} report to {}", path.display());

        let writer = Writer::from_writer(file);
        data_container
            .file_writers
            .borrow_mut()
            .insert(TypeId::of::<T>(), writer);
        Ok(())
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), EpiError> {
        let no_writer = || EpiError::ReportError("No writer found for the report type".to_string());
        // No data container will exist if no reports have been added
        let data_container = self.get_data_container(ReportPlugin).ok_or_else(no_writer)?;
        let mut writers = data_container.file_writers.borrow_mut();
        let writer = writers.get_mut(&report.type_id()).ok_or_else(no_writer)?;
        report.serialize(writer)?;
        Ok(())
    }

    fn flush_reports(&self) -> Result<(), EpiError> {
        if let Some(data_container) = self.get_data_container(ReportPlugin) {
            for writer in data_container.file_writers.borrow_mut().values_mut() {
                writer.flush()?;
            }
            trace!("flushed reports");
        }
        Ok(())
    }
}
