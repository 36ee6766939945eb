use std::io::stdout;

use clap::Parser;
use hyperdata::{LanguageCatalog, LanguageEntry};

use crate::prelude::*;

/// Print the language catalog as CSV.
#[derive(Debug, Parser)]
pub(crate) struct Languages {
    /// Print only languages with a text-processing implementation.
    #[arg(long)]
    implemented: bool,
}

impl Languages {
    pub(crate) fn execute(self, config: &Config) -> CorpusResult<()> {
        let loaded = config.catalog()?;
        let catalog = match loaded {
            Some(ref catalog) => catalog,
            None => LanguageCatalog::builtin(),
        };

        let mut writer = csv::Writer::from_writer(stdout().lock());
        let entries: Box<dyn Iterator<Item = &LanguageEntry>> =
            if self.implemented {
                Box::new(catalog.implemented())
            } else {
                Box::new(catalog.iter())
            };

        for entry in entries {
            writer.serialize(entry)?;
        }

        writer.flush()?;
        Ok(())
    }
}
