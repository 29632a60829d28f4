use preeti_unicode::{
    Config, ConfigError, ConversionError, ConvertOptions, Converter, OutputFormat, RuleDefinition,
    SpanOrigin, TrailingMarker, VariantDefinition,
};
use std::io::Write;
use std::{fs::File, io::BufReader};

fn assert_converted_output(input_path: &str, expected_output: &str, parallel: bool) {
    let expected_output_normalized = expected_output.replace("\r\n", "\n");

    let converter = Converter::new();
    let mut buf = vec![];
    let reader = BufReader::new(File::open(input_path).unwrap());
    let options = ConvertOptions::default();
    if parallel {
        converter.convert_file_parallel(reader, &mut buf, &options).unwrap();
    } else {
        converter.convert_file(reader, &mut buf, &options).unwrap();
    }

    let actual_output_normalized = String::from_utf8(buf).unwrap().replace("\r\n", "\n");

    assert_eq!(actual_output_normalized, expected_output_normalized);
}

fn convert_lines(converter: &Converter, input: &str, options: &ConvertOptions) -> String {
    let mut buf = vec![];
    converter
        .convert_file(input.as_bytes(), &mut buf, options)
        .unwrap();
    String::from_utf8(buf).unwrap()
}

/// A variant with a few letters and no digit mappings.
fn letters_only(name: &str) -> VariantDefinition {
    VariantDefinition::new(name)
        .with_mapping('a', "अ")
        .with_mapping('k', "क")
        .with_rule(RuleDefinition::new("ab", "X", 5))
        .with_rule(RuleDefinition::new("abc", "Y", 5))
}

#[test]
fn test_mixed_file_conversion() {
    assert_converted_output(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/test/mixed.txt"),
        include_str!("test/mixed.unicode-ref.txt"),
        false,
    );
}

#[test]
fn test_mixed_file_conversion_parallel() {
    assert_converted_output(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/test/mixed.txt"),
        include_str!("test/mixed.unicode-ref.txt"),
        true,
    );
}

#[test]
fn test_visual_order_examples() {
    let converter = Converter::new();
    assert_eq!(converter.convert("k]", None, true), "पे");
    assert_eq!(converter.convert("cf", None, true), "आ");
    assert_eq!(converter.convert("lk", None, true), "पि");
    assert_eq!(converter.convert("sd{", None, true), "कर्म");
    assert_eq!(converter.convert("lzIff", None, true), "शिक्षा");
    assert_eq!(converter.convert("", None, true), "");
}

#[test]
fn test_free_functions_use_the_global_converter() {
    assert_eq!(preeti_unicode::convert("g]kfn", None, true), "नेपाल");
    assert_eq!(
        preeti_unicode::convert("@)&( ;fn", Some("standard"), true),
        "२०७९ साल"
    );

    preeti_unicode::register_variant(&letters_only("global-letters")).unwrap();
    assert_eq!(
        preeti_unicode::convert("ka", Some("global-letters"), true),
        "कअ"
    );
}

#[test]
fn test_trailing_marker_policy() {
    let emit = Converter::new();
    assert_eq!(emit.convert("kl", None, true), "पि");
    assert_eq!(emit.convert("k]l", None, true), "पेि");

    let drop = Converter::with_config(Config {
        trailing_marker: TrailingMarker::Drop,
        ..Config::default()
    })
    .unwrap();
    assert_eq!(drop.convert("kl", None, true), "प");
    assert_eq!(drop.convert("l", None, true), "");
    assert_eq!(drop.convert("lk", None, true), "पि");
}

#[test]
fn test_longest_rule_wins() {
    let converter = Converter::new();
    converter.register_variant(&letters_only("letters")).unwrap();

    assert_eq!(converter.convert("abcab", Some("letters"), true), "YX");
    assert_eq!(converter.convert("aba", Some("letters"), true), "Xअ");
    assert_eq!(converter.convert("zq", Some("letters"), true), "zq");
}

#[test]
fn test_higher_priority_beats_longer_source() {
    let converter = Converter::new();
    let def = VariantDefinition::new("priorities")
        .with_rule(RuleDefinition::new("ab", "X", 1))
        .with_rule(RuleDefinition::new("a", "Z", 9));
    converter.register_variant(&def).unwrap();

    assert_eq!(converter.convert("ab", Some("priorities"), true), "Zb");
}

#[test]
fn test_variants_are_isolated() {
    let converter = Converter::new();
    let def = VariantDefinition::new("custom-k")
        .with_base("standard")
        .with_mapping('k', "क");
    converter.register_variant(&def).unwrap();

    assert_eq!(converter.convert("k]", Some("custom-k"), true), "के");
    assert_eq!(converter.convert("k]", Some("standard"), true), "पे");
    assert_eq!(converter.convert("k]", Some("kantipur"), true), "पे");
    assert_eq!(converter.convert("k]", Some("preeti_plus"), true), "पे");

    // Plus signs stay out of the other variants.
    assert_eq!(converter.convert("é", Some("preeti_plus"), true), "ॐ");
    assert_eq!(converter.convert("é", Some("standard"), true), "é");
    assert_eq!(converter.convert("É", Some("kantipur"), true), "ॐ");
    assert_eq!(converter.convert("É", Some("preeti_plus"), true), "É");
}

#[test]
fn test_kantipur_ligature() {
    let converter = Converter::new();
    assert_eq!(converter.convert("Qmd", Some("kantipur"), true), "स्म");
    assert_eq!(converter.convert("Qmd", Some("standard"), true), "त्तफम");
}

#[test]
fn test_digit_localization_can_be_disabled() {
    let converter = Converter::new();
    converter.register_variant(&letters_only("digits")).unwrap();

    assert_eq!(converter.convert("a 2080", Some("digits"), true), "अ २०८०");
    assert_eq!(converter.convert("a 2080", Some("digits"), false), "अ 2080");

    // Standard maps ASCII digits to letters before localization runs.
    assert_eq!(converter.convert("12", Some("standard"), false), "ज्ञद्द");
}

#[test]
fn test_conversion_is_deterministic() {
    let converter = Converter::new();
    let input = "o; b]zsf] /fhwfgL sf7df8f}+ xf] .";
    let first = converter.convert(input, None, true);
    for _ in 0..10 {
        assert_eq!(converter.convert(input, None, true), first);
    }
    assert_eq!(first, Converter::new().convert(input, None, true));
}

#[test]
fn test_unicode_input_is_left_alone() {
    let converter = Converter::new();
    for text in ["नेपाल", "मेरो नाम राम हो ।", "२०७९ साल"] {
        assert_eq!(converter.convert(text, None, true), text);
        let once = converter.convert(text, None, true);
        assert_eq!(converter.convert(&once, None, true), once);
    }
}

#[test]
fn test_unknown_variant_falls_back_to_default() {
    let converter = Converter::new();
    assert_eq!(converter.convert("g]kfn", Some("no-such-font"), true), "नेपाल");
}

#[test]
fn test_auto_detection() {
    let converter = Converter::new();

    let plus = converter.convert_auto("é gdM lzjfo", None);
    assert_eq!(plus.variant, "preeti_plus");
    assert_eq!(plus.text, "ॐ नमः शिवाय");

    let kantipur = converter.convert_auto("Qmd", Some("Kantipur Regular"));
    assert_eq!(kantipur.variant, "kantipur");
    assert_eq!(kantipur.text, "स्म");

    let standard = converter.convert_auto("g]kfn", None);
    assert_eq!(standard.variant, "standard");
    assert_eq!(standard.text, "नेपाल");
    assert_eq!(standard.stats.table_hits, 5);

    // A tie between two variants' markers falls back to the default.
    assert_eq!(converter.detect_variant(None, Some("é É")), "standard");
}

#[test]
fn test_auto_detection_can_be_disabled() {
    let converter = Converter::with_config(Config {
        auto_detect: false,
        ..Config::default()
    })
    .unwrap();
    let conversion = converter.convert_auto("é", Some("Preeti Plus"));
    assert_eq!(conversion.variant, "standard");
    assert_eq!(conversion.text, "é");
}

#[test]
fn test_register_variant_errors() {
    let converter = Converter::new();

    assert!(matches!(
        converter.register_variant(&VariantDefinition::new("  ").with_mapping('a', "अ")),
        Err(ConfigError::EmptyName)
    ));
    assert!(matches!(
        converter.register_variant(&VariantDefinition::new("bare")),
        Err(ConfigError::NoRules { .. })
    ));

    let mut long_key = VariantDefinition::new("long-key");
    long_key.mappings.insert("ab".to_string(), "x".to_string());
    assert!(matches!(
        converter.register_variant(&long_key),
        Err(ConfigError::InvalidMappingKey { .. })
    ));

    let long_rule = VariantDefinition::new("long-rule").with_rule(RuleDefinition::new("abcd", "x", 0));
    assert!(matches!(
        converter.register_variant(&long_rule),
        Err(ConfigError::RuleSourceLength { len: 4, .. })
    ));

    let conflict = VariantDefinition::new("conflict")
        .with_rule(RuleDefinition::new("ab", "x", 0))
        .with_rule(RuleDefinition::new("ab", "y", 0));
    assert!(matches!(
        converter.register_variant(&conflict),
        Err(ConfigError::ConflictingRule { .. })
    ));

    let orphan = VariantDefinition::new("orphan")
        .with_base("missing")
        .with_mapping('a', "अ");
    assert!(matches!(
        converter.register_variant(&orphan),
        Err(ConfigError::UnknownBase { .. })
    ));

    assert!(!converter.registry().contains("conflict"));
    assert!(!converter.registry().contains("orphan"));
}

#[test]
fn test_max_lines_and_spans_output() {
    let converter = Converter::new();

    let options = ConvertOptions {
        max_lines: Some(2),
        ..ConvertOptions::default()
    };
    assert_eq!(
        convert_lines(&converter, "g]kfn\nk]\nlk\n", &options),
        "नेपाल\nपे\n"
    );

    let options = ConvertOptions {
        variant: Some("standard".to_string()),
        format: OutputFormat::Spans,
        ..ConvertOptions::default()
    };
    assert_eq!(
        convert_lines(&converter, "k]\n", &options),
        concat!(
            r#"[{"start":0,"end":1,"text":"प","origin":"table"},"#,
            r#"{"start":1,"end":2,"text":"े","origin":"table"}]"#,
            "\n"
        )
    );
}

#[test]
fn test_font_directive_overrides_detection() {
    let converter = Converter::new();
    let output = convert_lines(
        &converter,
        "::font Kantipur Qmd\nQmd\n",
        &ConvertOptions::default(),
    );
    assert_eq!(output, "::font Kantipur स्म\nत्तफम\n");
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let converter = Converter::new();
    let mut buf = vec![];
    converter
        .convert_file(&b"k]\xff\n"[..], &mut buf, &ConvertOptions::default())
        .unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "पे\u{FFFD}\n");
}

#[test]
fn test_invalid_utf8_is_replaced_in_parallel() {
    let converter = Converter::new();
    let mut buf = vec![];
    let stats = converter
        .convert_file_parallel(&b"g]kfn\nk]\xff\nlk"[..], &mut buf, &ConvertOptions::default())
        .unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "नेपाल\nपे\u{FFFD}\nपि\n");
    assert_eq!(stats.passthrough, 1);
}

#[test]
fn test_register_variant_file() {
    let mut definition = tempfile::NamedTempFile::new().unwrap();
    write!(
        definition,
        r#"{{ "name": "Typewriter", "base": "preeti_plus", "mappings": {{ "k": "क" }} }}"#
    )
    .unwrap();

    let converter = Converter::new();
    converter.register_variant_file(definition.path()).unwrap();
    assert!(converter.registry().contains("typewriter"));
    assert_eq!(converter.convert("k] é", Some("TYPEWRITER"), true), "के ॐ");

    let mut broken = tempfile::NamedTempFile::new().unwrap();
    write!(broken, "{{ not json").unwrap();
    assert!(matches!(
        converter.register_variant_file(broken.path()),
        Err(ConversionError::ParseDefinition { .. })
    ));
}

#[test]
fn test_convert_spans_reports_origins() {
    let converter = Converter::new();
    let spans = converter.convert_spans("Qmd", Some("kantipur"));
    let origins: Vec<SpanOrigin> = spans.iter().map(|span| span.origin).collect();
    assert_eq!(origins, [SpanOrigin::Rule, SpanOrigin::Table]);
    assert_eq!(spans[0].text, "स्");
    assert_eq!((spans[1].start, spans[1].end), (2, 3));
}

#[test]
fn test_config_and_definition_files() {
    let mut definition = tempfile::NamedTempFile::new().unwrap();
    write!(
        definition,
        r#"{{
            "name": "office",
            "base": "standard",
            "display_name": "Office Preeti",
            "mappings": {{ "k": "क" }},
            "rules": [ {{ "source": "Qm", "target": "स्", "priority": 15 }} ],
            "font_names": ["office preeti"]
        }}"#
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let config = Config {
        default_variant: "office".to_string(),
        definition_files: vec![definition.path().to_path_buf()],
        ..Config::default()
    };
    config.save(&config_path).unwrap();

    let loaded = Config::from_path(&config_path).unwrap();
    assert_eq!(loaded, config);

    let converter = Converter::with_config(loaded).unwrap();
    assert_eq!(converter.registry().default_variant(), "office");
    assert_eq!(converter.convert("Qmk]", None, true), "स्के");
    assert_eq!(
        converter.detect_variant(Some("Office Preeti Bold"), None),
        "office"
    );
    assert_eq!(
        converter.get_variant("office").unwrap().metadata().display_name,
        "Office Preeti"
    );
}

#[test]
fn test_missing_definition_file_is_reported() {
    let config = Config {
        definition_files: vec!["/nonexistent/variant.json".into()],
        ..Config::default()
    };
    assert!(Converter::with_config(config).is_err());

    let config = Config {
        default_variant: "nowhere".to_string(),
        ..Config::default()
    };
    assert!(Converter::with_config(config).is_err());
}

#[test]
fn test_exported_definition_rebuilds_the_variant() {
    let converter = Converter::new();
    let mut def = converter.get_variant("preeti_plus").unwrap().to_definition();
    def.name = "plus-copy".to_string();
    let json = def.to_json().unwrap();

    let parsed = VariantDefinition::from_json(&json).unwrap();
    converter.register_variant(&parsed).unwrap();

    let input = "é gdM lzjfo";
    assert_eq!(
        converter.convert(input, Some("plus-copy"), true),
        converter.convert(input, Some("preeti_plus"), true)
    );
}
