//! Attribute parameters, attributes and attribute lists

use std::fmt;


use crate::dictionary::{Dictionary, ATTRIBUTE_TABLE, ATTRIBUTES_TABLE, ATTRPARAM_TABLE, TYP_TABLE};
use crate::error::Result;
use crate::families::CTyp;
use crate::indexed_table::IndexedTable;
use crate::record::{Family, Record, Target};
use crate::registry::Registry;

/// Attribute parameter family (`attrparam-table`)
pub struct AttrParams;

pub type AttrParamConstructor = for<'d> fn(Record<'d>) -> Box<dyn AttrParam<'d> + 'd>;

impl Family for AttrParams {
    const NAME: &'static str = "attribute parameter";

    type View<'d> = dyn AttrParam<'d> + 'd;
    type Constructor = AttrParamConstructor;

    fn construct<'d>(constructor: Self::Constructor, record: Record<'d>) -> Box<Self::View<'d>> {
        constructor(record)
    }

    fn table(dictionary: &Dictionary) -> &IndexedTable {
        dictionary.attrparam_table()
    }

    fn table_mut(dictionary: &mut Dictionary) -> &mut IndexedTable {
        dictionary.attrparam_table_mut()
    }
}

/// Parameter of a C attribute, e.g. the `4` in `aligned(4)`
pub trait AttrParam<'d>: fmt::Display + fmt::Debug {
    fn record(&self) -> &Record<'d>;

    fn index(&self) -> usize {
        self.record().index()
    }

    fn tag(&self) -> &'d str {
        self.record().tag()
    }

    /// The attribute parameter operated on, for unary forms
    fn param(&self) -> Result<Option<Target<'_, dyn AttrParam<'d> + 'd>>> {
        Ok(None)
    }

    fn is_int(&self) -> bool {
        false
    }

    fn is_str(&self) -> bool {
        false
    }

    fn is_cons(&self) -> bool {
        false
    }

    fn is_star(&self) -> bool {
        false
    }
}

fn other_param<'d>(record: &Record<'d>, position: usize) -> Result<Box<dyn AttrParam<'d> + 'd>> {
    let index = record.arg_index(position, ATTRPARAM_TABLE)?;
    record.dictionary().get_attrparam(index)
}

/// Attribute parameter at `position` of `view`, which may be `view` itself
fn param_at<'v, 'd>(
    view: &'v (dyn AttrParam<'d> + 'd),
    position: usize,
) -> Result<Target<'v, dyn AttrParam<'d> + 'd>> {
    view.record()
        .follow(view, position, ATTRPARAM_TABLE, |dictionary, index| {
            dictionary.get_attrparam(index)
        })
}

fn typ<'d>(record: &Record<'d>, position: usize) -> Result<Box<dyn CTyp<'d> + 'd>> {
    let index = record.arg_index(position, TYP_TABLE)?;
    record.dictionary().get_typ(index)
}

/// Display helper that renders a failed lookup inline instead of aborting
/// the whole rendering
struct Shown<T>(Result<T>);

impl<T: fmt::Display> fmt::Display for Shown<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Ok(value) => value.fmt(f),
            Err(err) => write!(f, "<{}>", err),
        }
    }
}

pub(crate) fn shown<T>(result: Result<T>) -> impl fmt::Display
where
    T: fmt::Display,
{
    Shown(result)
}

/// Integer parameter
///
/// - args[0]: value
#[derive(Debug)]
pub struct AttrInt<'d>(Record<'d>);

impl AttrInt<'_> {
    pub fn intvalue(&self) -> Result<i64> {
        self.0.arg(0, ATTRPARAM_TABLE)
    }
}

impl<'d> AttrParam<'d> for AttrInt<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn is_int(&self) -> bool {
        true
    }
}

impl fmt::Display for AttrInt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aint({})", shown(self.intvalue()))
    }
}

/// String parameter
///
/// - tags[1]: string value
#[derive(Debug)]
pub struct AttrStr<'d>(Record<'d>);

impl<'d> AttrStr<'d> {
    pub fn stringvalue(&self) -> &'d str {
        self.0.tag_at(1)
    }
}

impl<'d> AttrParam<'d> for AttrStr<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn is_str(&self) -> bool {
        true
    }
}

impl fmt::Display for AttrStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "astr({})", self.stringvalue())
    }
}

/// Constructed parameter `name(params...)`
///
/// - tags[1]: name
/// - args[0..]: attribute parameters
#[derive(Debug)]
pub struct AttrCons<'d>(Record<'d>);

impl<'d> AttrCons<'d> {
    pub fn name(&self) -> &'d str {
        self.0.tag_at(1)
    }

    pub fn params(&self) -> Result<Vec<Target<'_, dyn AttrParam<'d> + 'd>>> {
        let this: &(dyn AttrParam<'d> + 'd) = self;
        (0..self.0.args().len())
            .map(|position| param_at(this, position))
            .collect()
    }
}

impl<'d> AttrParam<'d> for AttrCons<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn is_cons(&self) -> bool {
        true
    }
}

impl fmt::Display for AttrCons<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params() {
            Ok(params) => {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "acons({},{})", self.name(), params.join(","))
            }
            Err(err) => write!(f, "acons({},<{}>)", self.name(), err),
        }
    }
}

/// `sizeof` / `alignof` of a type
///
/// - args[0]: type
#[derive(Debug)]
pub struct AttrTypeOp<'d>(Record<'d>);

impl<'d> AttrTypeOp<'d> {
    pub fn typ(&self) -> Result<Box<dyn CTyp<'d> + 'd>> {
        typ(&self.0, 0)
    }
}

impl<'d> AttrParam<'d> for AttrTypeOp<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for AttrTypeOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.0.tag(), shown(self.typ()))
    }
}

/// Unary form over another attribute parameter (`asizeofe`, `aalignofe`,
/// `aunop`, `adot`, `aaddrof`)
///
/// - tags[1]: operator or field suffix, when present
/// - args[0]: attribute parameter
#[derive(Debug)]
pub struct AttrUnary<'d>(Record<'d>);

impl<'d> AttrUnary<'d> {
    pub fn operator(&self) -> &'d str {
        self.0.tag_at(1)
    }
}

impl<'d> AttrParam<'d> for AttrUnary<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn param(&self) -> Result<Option<Target<'_, dyn AttrParam<'d> + 'd>>> {
        param_at(self, 0).map(Some)
    }
}

impl fmt::Display for AttrUnary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let param = shown(param_at(self, 0));
        match self.0.tag() {
            "aunop" => write!(f, "aunop({},{})", self.operator(), param),
            "adot" => write!(f, "adot({}.{})", param, self.operator()),
            tag => write!(f, "{}({})", tag, param),
        }
    }
}

/// Dereference of an attribute parameter. A record whose argument is its
/// own index stands for "the annotated object itself".
///
/// - args[0]: attribute parameter, possibly this record
#[derive(Debug)]
pub struct AttrStar<'d>(Record<'d>);

impl<'d> AttrStar<'d> {
    pub fn is_self_referential(&self) -> bool {
        self.0.is_self_reference(0)
    }
}

impl<'d> AttrParam<'d> for AttrStar<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn is_star(&self) -> bool {
        true
    }

    fn param(&self) -> Result<Option<Target<'_, dyn AttrParam<'d> + 'd>>> {
        param_at(self, 0).map(Some)
    }
}

impl fmt::Display for AttrStar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_self_referential() {
            write!(f, "astar()")
        } else {
            write!(f, "astar({})", shown(param_at(self, 0)))
        }
    }
}

/// Binary and ternary forms (`abinop`, `aindex`, `aquestion`)
///
/// - tags[1]: operator (`abinop` only)
/// - args[0..]: attribute parameters
#[derive(Debug)]
pub struct AttrNary<'d>(Record<'d>);

impl<'d> AttrNary<'d> {
    pub fn operands(&self) -> Result<Vec<Target<'_, dyn AttrParam<'d> + 'd>>> {
        let this: &(dyn AttrParam<'d> + 'd) = self;
        (0..self.0.args().len())
            .map(|position| param_at(this, position))
            .collect()
    }
}

impl<'d> AttrParam<'d> for AttrNary<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for AttrNary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = match self.operands() {
            Ok(operands) => operands,
            Err(err) => return write!(f, "{}(<{}>)", self.0.tag(), err),
        };
        match (self.0.tag(), operands.as_slice()) {
            ("abinop", [a, b]) => write!(f, "abinop({} {} {})", a, self.0.tag_at(1), b),
            ("aindex", [a, b]) => write!(f, "aindex({}[{}])", a, b),
            ("aquestion", [a, b, c]) => write!(f, "aquestion({} ? {} : {})", a, b, c),
            (tag, operands) => {
                let operands: Vec<String> = operands.iter().map(|o| o.to_string()).collect();
                write!(f, "{}({})", tag, operands.join(","))
            }
        }
    }
}

fn construct_int<'d>(record: Record<'d>) -> Box<dyn AttrParam<'d> + 'd> {
    Box::new(AttrInt(record))
}

fn construct_str<'d>(record: Record<'d>) -> Box<dyn AttrParam<'d> + 'd> {
    Box::new(AttrStr(record))
}

fn construct_cons<'d>(record: Record<'d>) -> Box<dyn AttrParam<'d> + 'd> {
    Box::new(AttrCons(record))
}

fn construct_type_op<'d>(record: Record<'d>) -> Box<dyn AttrParam<'d> + 'd> {
    Box::new(AttrTypeOp(record))
}

fn construct_unary<'d>(record: Record<'d>) -> Box<dyn AttrParam<'d> + 'd> {
    Box::new(AttrUnary(record))
}

fn construct_star<'d>(record: Record<'d>) -> Box<dyn AttrParam<'d> + 'd> {
    Box::new(AttrStar(record))
}

fn construct_nary<'d>(record: Record<'d>) -> Box<dyn AttrParam<'d> + 'd> {
    Box::new(AttrNary(record))
}

pub(crate) fn register(registry: &mut Registry) {
    let variants: [(&str, AttrParamConstructor); 14] = [
        ("aint", construct_int),
        ("astr", construct_str),
        ("acons", construct_cons),
        ("asizeof", construct_type_op),
        ("aalignof", construct_type_op),
        ("asizeofe", construct_unary),
        ("aalignofe", construct_unary),
        ("aunop", construct_unary),
        ("adot", construct_unary),
        ("aaddrof", construct_unary),
        ("astar", construct_star),
        ("abinop", construct_nary),
        ("aindex", construct_nary),
        ("aquestion", construct_nary),
    ];
    for (tag, constructor) in variants {
        registry.bind::<AttrParams>(tag, constructor);
    }
}

/// Attribute `name(params...)` (`attribute-table`)
///
/// - tags[0]: attribute name
/// - args[0..]: attribute parameters
#[derive(Debug, Clone, Copy)]
pub struct Attribute<'d>(Record<'d>);

impl<'d> Attribute<'d> {
    pub fn new(record: Record<'d>) -> Self {
        Self(record)
    }

    pub fn index(&self) -> usize {
        self.0.index()
    }

    pub fn name(&self) -> &'d str {
        self.0.tag()
    }

    pub fn params(&self) -> Result<Vec<Box<dyn AttrParam<'d> + 'd>>> {
        (0..self.0.args().len())
            .map(|position| other_param(&self.0, position))
            .collect()
    }
}

impl fmt::Display for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params() {
            Ok(params) => {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "{}: {}", self.name(), params.join(" "))
            }
            Err(err) => write!(f, "{}: <{}>", self.name(), err),
        }
    }
}

/// List of attributes (`attributes-table`)
///
/// - args[0..]: attributes
#[derive(Debug, Clone, Copy)]
pub struct Attributes<'d>(Record<'d>);

impl<'d> Attributes<'d> {
    pub fn new(record: Record<'d>) -> Self {
        Self(record)
    }

    pub fn index(&self) -> usize {
        self.0.index()
    }

    pub fn len(&self) -> usize {
        self.0.args().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.args().is_empty()
    }

    pub fn attributes(&self) -> Result<Vec<Attribute<'d>>> {
        (0..self.0.args().len())
            .map(|position| {
                let index = self.0.arg_index(position, ATTRIBUTE_TABLE)?;
                self.0.dictionary().get_attribute(index)
            })
            .collect()
    }
}

impl fmt::Display for Attributes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attributes() {
            Ok(attributes) => {
                let attributes: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
                write!(f, "{}", attributes.join(","))
            }
            Err(err) => write!(f, "<{} in {}>", err, ATTRIBUTES_TABLE),
        }
    }
}
