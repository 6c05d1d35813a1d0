//! Loading, resolving and persisting whole dictionaries

use std::fmt;
use std::sync::Arc;

use cdict_core::families::{CTyp, Typs};
use cdict_core::{Dictionary, DictionaryError, Element, Record, Registry};
use cdict_test_fixtures::{DICTIONARY_MISSING_TABLE, DICTIONARY_UNKNOWN_TAG, SAMPLE_DICTIONARY};
use pretty_assertions::assert_eq;

fn sample() -> Dictionary {
    let root = Element::parse(SAMPLE_DICTIONARY).unwrap();
    Dictionary::from_xml(Registry::shared(), &root).unwrap()
}

#[test]
fn test_load_preserves_indices() {
    let dictionary = sample();

    assert_eq!(dictionary.typ_table().size(), 6);
    assert_eq!(dictionary.typ_table().next_index(), 6);
    assert_eq!(dictionary.attributes_table().size(), 2);

    let value = dictionary.typ_table().retrieve(4).unwrap();
    assert_eq!(value.tag(), "tfun");
    assert_eq!(value.args(), &[1i64, 0, 0, 0]);
}

#[test]
fn test_typed_views_resolve_across_tables() {
    let dictionary = sample();

    let rendered: Vec<String> = (0..6)
        .map(|ix| dictionary.get_typ(ix).unwrap().to_string())
        .collect();
    assert_eq!(
        rendered,
        vec![
            "void",
            "iint",
            "(iint *) [aligned: aint(4)]",
            "iint[10]",
            "(iint)(iint x)",
            "struct 12",
        ]
    );

    let ptr = dictionary.get_typ(2).unwrap();
    assert!(ptr.is_pointer());
    assert!(ptr.target().unwrap().unwrap().is_int());
    assert_eq!(ptr.attributes().unwrap().len(), 1);

    let funargs = dictionary.get_funargs(0).unwrap();
    let args = funargs.args().unwrap();
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].name(), "x");
    assert!(args[0].typ().unwrap().is_int());
}

#[test]
fn test_expression_values() {
    let dictionary = sample();

    let exp = dictionary.get_exp(0).unwrap();
    assert!(exp.is_constant());
    assert_eq!(exp.intvalue().unwrap().unwrap(), 10);
    assert_eq!(exp.to_string(), "10");

    let constant = dictionary.get_constant(0).unwrap();
    assert!(constant.is_int());
}

#[test]
fn test_self_referential_attribute_parameter() {
    let dictionary = sample();

    let star = dictionary.get_attrparam(1).unwrap();
    assert!(star.is_star());
    assert_eq!(star.to_string(), "astar()");

    let target = star.param().unwrap().unwrap();
    assert!(target.is_itself());
    assert_eq!(target.index(), 1);
    assert!(target.is_star());
}

#[test]
fn test_attribute_parameter_chain() {
    let mut dictionary = sample();

    let int = dictionary.index_attrparam(&["aint"], &[8]).unwrap();
    let star = dictionary.index_attrparam(&["astar"], &[int as i64]).unwrap();

    let view = dictionary.get_attrparam(star).unwrap();
    let target = view.param().unwrap().unwrap();
    assert!(!target.is_itself());
    assert_eq!(target.index(), int);
    assert_eq!(view.to_string(), "astar(aint(8))");
}

#[test]
fn test_self_reference_in_unary_attribute_parameter() {
    let mut dictionary = Dictionary::default();
    let ix = dictionary.index_attrparam(&["aunop", "-"], &[0]).unwrap();
    assert_eq!(ix, 0);

    let view = dictionary.get_attrparam(ix).unwrap();
    assert_eq!(view.to_string(), "aunop(-,self)");
    let target = view.param().unwrap().unwrap();
    assert!(target.is_itself());
    assert_eq!(target.index(), ix);
}

#[test]
fn test_self_reference_in_types_and_expressions() {
    let mut dictionary = Dictionary::default();
    let empty = dictionary.index_attributes(&[]).unwrap() as i64;

    let ptr = dictionary.index_typ(&["tptr"], &[0, empty]).unwrap();
    let view = dictionary.get_typ(ptr).unwrap();
    assert_eq!(view.to_string(), "(self *)");
    assert!(view.target().unwrap().unwrap().is_itself());
    drop(view);

    let int = dictionary.index_typ(&["tint", "iint"], &[empty]).unwrap() as i64;
    let neg = dictionary.index_exp(&["unop", "neg"], &[0, int]).unwrap();
    let exp = dictionary.get_exp(neg).unwrap();
    assert_eq!(exp.to_string(), "(neg self)");
    let subexps = exp.subexps().unwrap();
    assert_eq!(subexps.len(), 1);
    assert!(subexps[0].is_itself());
}

#[test]
fn test_failed_read_leaves_dictionary_untouched() {
    let mut dictionary = Dictionary::default();
    let empty = dictionary.index_attributes(&[]).unwrap();
    let void = dictionary.index_typ(&["tvoid"], &[empty as i64]).unwrap();

    // valid attrparam-table, typ-table with the same record at two indices
    let text = SAMPLE_DICTIONARY.replace(
        r#"<n t="tint,iint" a="0" ix="1"/>"#,
        r#"<n t="tvoid" a="0" ix="1"/>"#,
    );
    let err = dictionary
        .read_xml(&Element::parse(&text).unwrap())
        .unwrap_err();
    assert!(matches!(err, DictionaryError::MalformedEntry { .. }));

    assert!(dictionary.attrparam_table().is_empty());
    assert_eq!(dictionary.attributes_table().size(), 1);
    assert_eq!(dictionary.typ_table().size(), 1);
    assert_eq!(dictionary.typ_table().lookup(&["tvoid"], &[empty as i64]), Some(void));
}

#[test]
fn test_fixed_shape_records_check_arity() {
    let text = SAMPLE_DICTIONARY
        .replace(r#"<n t="x" a="1,0" ix="0"/>"#, r#"<n t="x" a="1" ix="0"/>"#)
        .replace(r#"a="12,0" ix="5""#, r#"a="12" ix="5""#);
    let dictionary = Dictionary::from_xml(Registry::shared(), &Element::parse(&text).unwrap()).unwrap();

    let err = dictionary.get_funarg(0).unwrap_err();
    assert!(matches!(
        err,
        DictionaryError::ValueMismatch {
            expected_args: 2,
            found_args: 1,
            ..
        }
    ));
    assert!(dictionary
        .get_typ(5)
        .unwrap()
        .to_string()
        .starts_with("struct <Dictionary record mismatch for tcomp in typ-table"));
}

#[test]
fn test_missing_table_section() {
    let root = Element::parse(DICTIONARY_MISSING_TABLE).unwrap();
    let err = Dictionary::from_xml(Registry::shared(), &root).unwrap_err();

    assert!(matches!(&err, DictionaryError::MissingTable(name) if name == "exp-table"));
    assert_eq!(err.to_string(), "Dictionary table exp-table not found");
}

#[test]
fn test_unknown_variant() {
    let root = Element::parse(DICTIONARY_UNKNOWN_TAG).unwrap();
    let dictionary = Dictionary::from_xml(Registry::shared(), &root).unwrap();

    assert!(dictionary.get_typ(0).unwrap().is_void());
    let err = dictionary.get_typ(1).unwrap_err();
    assert!(matches!(
        err,
        DictionaryError::UnknownVariant { family: "type", ref tag } if tag == "tquantum"
    ));
}

#[test]
fn test_missing_index() {
    let dictionary = sample();
    let err = dictionary.get_typ(99).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unable to retrieve item 99 from table typ-table (size 6)"
    );
}

#[test]
fn test_index_rejects_unregistered_tag() {
    let mut dictionary = Dictionary::default();
    let err = dictionary.index_typ(&["tquantum"], &[]).unwrap_err();
    assert!(matches!(err, DictionaryError::UnknownVariant { .. }));
    assert!(dictionary.typ_table().is_empty());
}

#[test]
fn test_index_deduplicates_and_checks_references() {
    let mut dictionary = Dictionary::default();

    let empty = dictionary.index_attributes(&[]).unwrap();
    let void = dictionary.index_typ(&["tvoid"], &[empty as i64]).unwrap();
    assert_eq!(dictionary.index_typ(&["tvoid"], &[empty as i64]).unwrap(), void);

    let arg = dictionary.index_funarg("p", void, empty).unwrap();
    assert_eq!(dictionary.index_funarg("p", void, empty).unwrap(), arg);

    let err = dictionary.index_funargs(&[arg, 7]).unwrap_err();
    assert!(matches!(err, DictionaryError::MissingIndex { index: 7, .. }));
    assert_eq!(dictionary.funargs_table().size(), 0);
}

#[test]
fn test_array_without_size() {
    let mut dictionary = sample();
    let ix = dictionary.index_typ(&["tarray"], &[1, -1, 0]).unwrap();

    let typ = dictionary.get_typ(ix).unwrap();
    assert!(typ.is_array());
    assert_eq!(typ.to_string(), "iint[?]");

    let array = dictionary.objectmap::<Typs>().unwrap();
    assert_eq!(array.len(), 7);
    assert!(array[&ix].is_array());
}

#[test]
fn test_checkpoint_all_rolls_back_every_table() {
    let mut dictionary = sample();
    let before = dictionary.write_xml().unwrap();

    let checkpoint = dictionary.checkpoint_all();
    let param = dictionary.index_attrparam(&["aint"], &[16]).unwrap();
    let attribute = dictionary.index_attribute("aligned", &[param]).unwrap();
    let attributes = dictionary.index_attributes(&[attribute]).unwrap();
    let ptr = dictionary.index_typ(&["tptr"], &[2, attributes as i64]).unwrap();
    assert_eq!(ptr, 6);

    dictionary.rollback_all(checkpoint).unwrap();
    assert_eq!(dictionary.write_xml().unwrap(), before);

    assert_eq!(dictionary.index_typ(&["tptr"], &[2, 0]).unwrap(), 6);
}

#[test]
fn test_write_and_reload() {
    let dictionary = sample();
    let text = dictionary.write_xml().unwrap().to_document().unwrap();

    let reloaded = Dictionary::from_xml(Registry::shared(), &Element::parse(&text).unwrap()).unwrap();
    for (table, copy) in dictionary.tables().iter().zip(reloaded.tables()) {
        assert_eq!(
            table.values().collect::<Vec<_>>(),
            copy.values().collect::<Vec<_>>()
        );
        assert_eq!(table.next_index(), copy.next_index());
    }
}

#[derive(Debug)]
struct TypQuantum<'d>(Record<'d>);

impl<'d> CTyp<'d> for TypQuantum<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for TypQuantum<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quantum")
    }
}

fn construct_quantum<'d>(record: Record<'d>) -> Box<dyn CTyp<'d> + 'd> {
    Box::new(TypQuantum(record))
}

#[test]
fn test_registered_variant_extends_family() {
    let mut registry = Registry::standard();
    assert_eq!(registry.tags::<Typs>().len(), 10);

    registry
        .register::<Typs>("tquantum", construct_quantum)
        .unwrap();
    let err = registry
        .register::<Typs>("tptr", construct_quantum)
        .unwrap_err();
    assert!(matches!(err, DictionaryError::DuplicateTag { family: "type", .. }));

    let root = Element::parse(DICTIONARY_UNKNOWN_TAG).unwrap();
    let dictionary = Dictionary::from_xml(Arc::new(registry), &root).unwrap();
    assert_eq!(dictionary.get_typ(1).unwrap().to_string(), "quantum");
}
