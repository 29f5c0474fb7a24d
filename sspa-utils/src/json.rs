use anyhow::{anyhow, Result};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

/// Extension marking a zlib-compressed json file.
pub const COMPRESSED_EXTENSION: &str = "z";

pub fn dejsonify<T>(json_str: &str) -> serde_json::Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_str::<T>(json_str)
}

/// Serializes with object keys sorted so equal values always give equal strings.
pub fn jsonify<T>(obj: &T) -> serde_json::Result<String>
where
    T: Serialize,
{
    serde_json::to_string(&sort_keys(serde_json::to_value(obj)?))
}

pub fn jsonify_pretty<T>(obj: &T) -> serde_json::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(&sort_keys(serde_json::to_value(obj)?))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(obj) => {
            let mut entries: Vec<(String, Value)> = obj.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

pub fn compress_obj<T>(input: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(jsonify(input)?.as_bytes())?;
    Ok(encoder.finish()?)
}

pub fn decompress_obj<T>(input: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut decoder = ZlibDecoder::new(input);
    let mut decompressed = String::new();
    decoder.read_to_string(&mut decompressed)?;
    Ok(dejsonify(&decompressed)?)
}

/// Writes `obj` as pretty json, or as zlib-compressed json when `compress` is set.
pub fn write_json_file<T>(path: &Path, obj: &T, compress: bool) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if compress {
        fs::write(path, compress_obj(obj)?)?;
    } else {
        fs::write(path, jsonify_pretty(obj)?)?;
    }
    Ok(())
}

/// Reads a file written by [`write_json_file`]; compression is detected from the extension.
pub fn read_json_file<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let bytes =
        fs::read(path).map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    if path.extension().and_then(|e| e.to_str()) == Some(COMPRESSED_EXTENSION) {
        decompress_obj(&bytes)
    } else {
        let text = std::str::from_utf8(&bytes)?;
        dejsonify(text).map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))
    }
}

/// Accepts either an inline json document or a path to a json file.
pub fn load_json_or_path<T>(input: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return dejsonify(input).map_err(|e| anyhow!("Failed to parse json: {}", e));
    }
    read_json_file(Path::new(input))
}
