use serde::{Deserialize, Serialize};
use serde_json::json;
use sspa_utils::*;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Sample {
    zeta: u32,
    alpha: Vec<String>,
    nested: Option<Box<Sample>>,
}

fn sample() -> Sample {
    Sample {
        zeta: 7,
        alpha: vec!["a".to_string(), "b".to_string()],
        nested: Some(Box::new(Sample {
            zeta: 1,
            alpha: vec![],
            nested: None,
        })),
    }
}

#[test]
fn test_jsonify_sorts_keys() {
    let value = json!({"b": 1, "a": {"d": 2, "c": [ {"y": 1, "x": 2} ]}});
    assert_eq!(
        jsonify(&value).unwrap(),
        r#"{"a":{"c":[{"x":2,"y":1}],"d":2},"b":1}"#
    );
}

#[test]
fn test_jsonify_is_stable_across_field_order() {
    let a = json!({"one": 1, "two": 2});
    let b = json!({"two": 2, "one": 1});
    assert_eq!(jsonify(&a).unwrap(), jsonify(&b).unwrap());
}

#[test]
fn test_compress_then_decompress() {
    let bytes = compress_obj(&sample()).unwrap();
    let back: Sample = decompress_obj(&bytes).unwrap();
    assert_eq!(back, sample());
}

#[test]
fn test_json_files_plain_and_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("nested/sample.json");
    let packed = dir.path().join("sample.json.z");

    write_json_file(&plain, &sample(), false).unwrap();
    write_json_file(&packed, &sample(), true).unwrap();

    assert!(std::fs::read_to_string(&plain).unwrap().contains("\"zeta\": 7"));
    assert_eq!(read_json_file::<Sample>(&plain).unwrap(), sample());
    assert_eq!(read_json_file::<Sample>(&packed).unwrap(), sample());
}

#[test]
fn test_load_json_or_path() {
    let inline: Sample = load_json_or_path(r#"{"zeta": 3, "alpha": [], "nested": null}"#).unwrap();
    assert_eq!(inline.zeta, 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.json");
    write_json_file(&path, &sample(), false).unwrap();
    let from_file: Sample = load_json_or_path(path.to_str().unwrap()).unwrap();
    assert_eq!(from_file, sample());

    assert!(load_json_or_path::<Sample>("/definitely/not/here.json").is_err());
}
