use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub fn read_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let buf = fs::read(path)?;
    Ok(serde_json::from_slice(&buf)?)
}

/// Writes `value` as pretty printed JSON, replacing the file at `path`.
pub fn write_json<T, P>(path: P, value: &T) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let mut buf = serde_json::to_vec_pretty(value)?;
    buf.push(b'\n');
    fs::write(path, buf)?;
    Ok(())
}

pub fn print_json<T>(value: &T) -> Result<()>
where
    T: Serialize,
{
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
