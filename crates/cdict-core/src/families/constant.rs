//! Constants (`constant-table`)

use std::fmt;

use crate::dictionary::{Dictionary, CONSTANT_TABLE, EXP_TABLE};
use crate::error::{DictionaryError, Result};
use crate::families::attributes::shown;
use crate::indexed_table::IndexedTable;
use crate::record::{Family, Record};
use crate::registry::Registry;

pub struct Constants;

pub type ConstantConstructor = for<'d> fn(Record<'d>) -> Box<dyn CConst<'d> + 'd>;

impl Family for Constants {
    const NAME: &'static str = "constant";

    type View<'d> = dyn CConst<'d> + 'd;
    type Constructor = ConstantConstructor;

    fn construct<'d>(constructor: Self::Constructor, record: Record<'d>) -> Box<Self::View<'d>> {
        constructor(record)
    }

    fn table(dictionary: &Dictionary) -> &IndexedTable {
        dictionary.constant_table()
    }

    fn table_mut(dictionary: &mut Dictionary) -> &mut IndexedTable {
        dictionary.constant_table_mut()
    }
}

pub trait CConst<'d>: fmt::Display + fmt::Debug {
    fn record(&self) -> &Record<'d>;

    fn index(&self) -> usize {
        self.record().index()
    }

    /// Integer value of integer, character and enumeration constants
    fn intvalue(&self) -> Option<Result<i64>> {
        None
    }

    fn is_int(&self) -> bool {
        false
    }

    fn is_str(&self) -> bool {
        false
    }
}

fn parse_tag<T: std::str::FromStr>(record: &Record<'_>, position: usize) -> Result<T>
where
    T::Err: fmt::Display,
{
    let text = record.tag_at(position);
    text.parse::<T>().map_err(|e| DictionaryError::MalformedEntry {
        table: CONSTANT_TABLE.to_string(),
        reason: format!("constant {}: cannot parse {:?}: {}", record.index(), text, e),
    })
}

/// Integer constant
///
/// - tags[1]: value
/// - tags[2]: integer kind
#[derive(Debug)]
pub struct ConstInt<'d>(Record<'d>);

impl<'d> ConstInt<'d> {
    pub fn ikind(&self) -> &'d str {
        self.0.tag_at(2)
    }
}

impl<'d> CConst<'d> for ConstInt<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn intvalue(&self) -> Option<Result<i64>> {
        Some(parse_tag(&self.0, 1))
    }

    fn is_int(&self) -> bool {
        true
    }
}

impl fmt::Display for ConstInt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.tag_at(1))
    }
}

/// String constant
///
/// - tags[1]: string value
#[derive(Debug)]
pub struct ConstStr<'d>(Record<'d>);

impl<'d> ConstStr<'d> {
    pub fn stringvalue(&self) -> &'d str {
        self.0.tag_at(1)
    }
}

impl<'d> CConst<'d> for ConstStr<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn is_str(&self) -> bool {
        true
    }
}

impl fmt::Display for ConstStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.stringvalue();
        if value.chars().count() > 25 {
            write!(f, "{}-char string", value.chars().count())
        } else {
            write!(f, "str({})", value)
        }
    }
}

/// Character constant
///
/// - args[0]: character code
#[derive(Debug)]
pub struct ConstChr<'d>(Record<'d>);

impl<'d> CConst<'d> for ConstChr<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn intvalue(&self) -> Option<Result<i64>> {
        Some(self.0.arg(0, CONSTANT_TABLE))
    }
}

impl fmt::Display for ConstChr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chr({})", shown(self.0.arg(0, CONSTANT_TABLE)))
    }
}

/// Floating point constant
///
/// - tags[1]: value
/// - tags[2]: float kind
#[derive(Debug)]
pub struct ConstReal<'d>(Record<'d>);

impl<'d> ConstReal<'d> {
    pub fn realvalue(&self) -> Result<f64> {
        parse_tag(&self.0, 1)
    }

    pub fn fkind(&self) -> &'d str {
        self.0.tag_at(2)
    }
}

impl<'d> CConst<'d> for ConstReal<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for ConstReal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.tag_at(1))
    }
}

/// Enumeration constant
///
/// - tags[1]: enumeration name
/// - tags[2]: item name
/// - args[0]: expression of the item value
#[derive(Debug)]
pub struct ConstEnum<'d>(Record<'d>);

impl<'d> ConstEnum<'d> {
    pub fn enum_name(&self) -> &'d str {
        self.0.tag_at(1)
    }

    pub fn item_name(&self) -> &'d str {
        self.0.tag_at(2)
    }

    pub fn exp(&self) -> Result<Box<dyn super::CExp<'d> + 'd>> {
        let index = self.0.arg_index(0, EXP_TABLE)?;
        self.0.dictionary().get_exp(index)
    }
}

impl<'d> CConst<'d> for ConstEnum<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for ConstEnum<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}({})",
            self.enum_name(),
            self.item_name(),
            shown(self.exp())
        )
    }
}

fn construct_int<'d>(record: Record<'d>) -> Box<dyn CConst<'d> + 'd> {
    Box::new(ConstInt(record))
}

fn construct_str<'d>(record: Record<'d>) -> Box<dyn CConst<'d> + 'd> {
    Box::new(ConstStr(record))
}

fn construct_chr<'d>(record: Record<'d>) -> Box<dyn CConst<'d> + 'd> {
    Box::new(ConstChr(record))
}

fn construct_real<'d>(record: Record<'d>) -> Box<dyn CConst<'d> + 'd> {
    Box::new(ConstReal(record))
}

fn construct_enum<'d>(record: Record<'d>) -> Box<dyn CConst<'d> + 'd> {
    Box::new(ConstEnum(record))
}

pub(crate) fn register(registry: &mut Registry) {
    let variants: [(&str, ConstantConstructor); 5] = [
        ("int", construct_int),
        ("str", construct_str),
        ("chr", construct_chr),
        ("real", construct_real),
        ("enum", construct_enum),
    ];
    for (tag, constructor) in variants {
        registry.bind::<Constants>(tag, constructor);
    }
}
