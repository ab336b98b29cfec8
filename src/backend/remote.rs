// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;
use std::io::Write;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::Error;
use crate::env::RemoteConfig;

const PROJECT_HEADER: &str = "x-log-project";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Buffers JSON lines and ships them as one NDJSON request per flush.
///
/// The non-blocking worker flushes after draining its queue, so each request carries whatever
/// accumulated since the previous one.
#[derive(Debug)]
pub(crate) struct HttpWriter {
    client: Client,
    endpoint: String,
    project: String,
    buffer: Vec<u8>,
}

impl HttpWriter {
    pub(crate) fn new(remote: &RemoteConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| Error::new("failed to build http client").with_source(err))?;

        Ok(Self {
            client,
            endpoint: remote.endpoint.clone(),
            project: remote.project.clone(),
            buffer: vec![],
        })
    }
}

impl Write for HttpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let body = std::mem::take(&mut self.buffer);
        self.client
            .post(&self.endpoint)
            .header(PROJECT_HEADER, &self.project)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .and_then(|response| response.error_for_status())
            .map(|_| ())
            .map_err(io::Error::other)
    }
}
