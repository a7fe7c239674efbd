//! Smart HTTP upload-pack client.
//!
//! Two requests against a remote repository URL: a GET to discover the
//! advertised head, then a POST asking for that commit, whose response
//! carries the packfile.

use crate::{PktLine, PktLineReader, PktLineWriter, ProtoError, Result};
use mingit_store::ObjectId;
use std::io::Read;
use std::time::Duration;

/// The service name both requests are scoped to.
const UPLOAD_PACK_SERVICE: &str = "git-upload-pack";

/// Client for one remote repository.
pub struct RemoteClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl RemoteClient {
    /// Creates a client for the repository at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { base_url, http })
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Discovers the remote's advertised head commit.
    ///
    /// Skips the service announcement and its flush, then takes the first
    /// advertised ref line and extracts its leading 40-hex id.
    pub fn discover_head(&self) -> Result<ObjectId> {
        let url = format!(
            "{}/info/refs?service={}",
            self.base_url, UPLOAD_PACK_SERVICE
        );
        tracing::debug!(url = %url, "discovering refs");
        let response = self.http.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProtoError::HttpStatus(status.as_u16()));
        }

        let mut reader = PktLineReader::new(response);
        let announcement = self.expect_data(&mut reader)?;
        if !announcement.starts_with(b"# service=") {
            return Err(ProtoError::Protocol(
                "missing service announcement".to_string(),
            ));
        }
        match reader.read()? {
            Some(PktLine::Flush) => {}
            _ => {
                return Err(ProtoError::Protocol(
                    "expected flush after service announcement".to_string(),
                ));
            }
        }

        let advertisement = self.expect_data(&mut reader)?;
        parse_advertised_id(&advertisement)
    }

    /// Fetches a packfile containing `want` and everything it references.
    ///
    /// The returned bytes are the raw pack, trailer included; the pack
    /// decoder verifies it.
    pub fn fetch_pack(&self, want: &ObjectId) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, UPLOAD_PACK_SERVICE);
        let mut body = PktLineWriter::new(Vec::new());
        body.write_data(format!("want {} no-progress\n", want).as_bytes())?;
        body.flush_pkt()?;
        body.write_data(b"done\n")?;
        let body = body.into_inner();

        tracing::debug!(url = %url, want = %want, "requesting pack");
        let response = self
            .http
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-git-upload-pack-request",
            )
            .body(body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProtoError::HttpStatus(status.as_u16()));
        }

        let mut reader = PktLineReader::new(response);
        let ack = self.expect_data(&mut reader)?;
        if ack != b"NAK\n" {
            return Err(ProtoError::Protocol(format!(
                "expected NAK, got {:?}",
                String::from_utf8_lossy(&ack)
            )));
        }

        let mut pack = Vec::new();
        reader.into_inner().read_to_end(&mut pack)?;
        tracing::debug!(bytes = pack.len(), "received pack");
        Ok(pack)
    }

    fn expect_data<R: Read>(&self, reader: &mut PktLineReader<R>) -> Result<Vec<u8>> {
        match reader.read()? {
            Some(PktLine::Data(data)) => Ok(data),
            Some(PktLine::Flush) => Err(ProtoError::Protocol(
                "unexpected flush packet".to_string(),
            )),
            None => Err(ProtoError::Protocol("unexpected end of response".to_string())),
        }
    }
}

/// Extracts the object id from a ref advertisement line of the form
/// `<40-hex> SP <refname>[\0<capabilities>]`.
fn parse_advertised_id(line: &[u8]) -> Result<ObjectId> {
    let text = std::str::from_utf8(line)
        .map_err(|_| ProtoError::Protocol("non-utf8 ref advertisement".to_string()))?;
    let id_field = text
        .split(' ')
        .next()
        .filter(|field| !field.is_empty())
        .ok_or_else(|| ProtoError::Protocol("empty ref advertisement".to_string()))?;
    ObjectId::from_hex(id_field)
        .map_err(|_| ProtoError::Protocol(format!("bad advertised id: {:?}", id_field)))
}
