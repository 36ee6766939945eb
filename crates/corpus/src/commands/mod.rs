pub(crate) use cvalue::Cvalue;
pub(crate) use languages::Languages;
pub(crate) use parse::Parse;

mod cvalue;
mod languages;
mod parse;
