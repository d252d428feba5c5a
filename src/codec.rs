//! JSON and XML glue between `serde` values and request/response bodies.

use crate::{error::BoxError, Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt, io};

/// MIME type sent for JSON bodies and requested for JSON results.
pub const JSON_MIME: &str = "application/json";

/// MIME type sent for XML bodies and requested for XML results.
pub const XML_MIME: &str = "application/xml";

/// Serializes a value into a blocking writer. Runs on the body producer.
pub(crate) type Encoder = Box<dyn FnOnce(&mut dyn io::Write) -> std::result::Result<(), BoxError> + Send>;

/// Decodes a fully read response body.
pub(crate) type Decoder<T> = fn(&[u8]) -> Result<T>;

pub(crate) fn json_encoder<T>(value: T) -> Encoder
where
    T: Serialize + Send + 'static,
{
    Box::new(move |writer: &mut dyn io::Write| -> std::result::Result<(), BoxError> {
        serde_json::to_writer(writer, &value)?;
        Ok(())
    })
}

pub(crate) fn xml_encoder<T>(value: T) -> Encoder
where
    T: Serialize + Send + 'static,
{
    Box::new(move |writer: &mut dyn io::Write| -> std::result::Result<(), BoxError> {
        let mut adapter = FmtWriter {
            inner: writer,
            error: None,
        };
        match quick_xml::se::to_writer(&mut adapter, &value) {
            Ok(_) => Ok(()),
            // An I/O failure underneath the formatter is the real cause.
            Err(e) => Err(match adapter.error.take() {
                Some(io_error) => io_error.into(),
                None => e.into(),
            }),
        }
    })
}

pub(crate) fn decode_json<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(Error::DecodeJson)
}

pub(crate) fn decode_xml<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(data).map_err(Error::InvalidUtf8)?;
    quick_xml::de::from_str(text).map_err(Error::DecodeXml)
}

pub(crate) fn decode_nothing(_data: &[u8]) -> Result<()> {
    Ok(())
}

/// `quick_xml` serializes into `fmt::Write`; bridge it onto the body pipe.
struct FmtWriter<'a> {
    inner: &'a mut dyn io::Write,
    error: Option<io::Error>,
}

impl fmt::Write for FmtWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}
