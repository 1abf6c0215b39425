use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::backend::{AccessibilityBackend, ElementHandle, Keystroke};
use crate::error::BackendError;
use crate::tree::tree_model::{Attribute, AttributeValue, NodeAttributes};

/// Request sent to the accessibility helper over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BridgeRequest {
    Root {
        cmd: &'static str,
        app: String,
    },
    Attribute {
        cmd: &'static str,
        handle: ElementHandle,
        attribute: Attribute,
    },
    Handle {
        cmd: &'static str,
        handle: ElementHandle,
    },
    FindIdentifier {
        cmd: &'static str,
        handle: ElementHandle,
        identifier: String,
        max_depth: usize,
    },
    WithValue {
        cmd: &'static str,
        handle: ElementHandle,
        value: String,
    },
    SendKey {
        cmd: &'static str,
        handle: ElementHandle,
        key: Keystroke,
    },
    Quit {
        cmd: &'static str,
    },
}

impl BridgeRequest {
    pub fn root(app: &str) -> Self {
        BridgeRequest::Root {
            cmd: "root",
            app: app.to_string(),
        }
    }

    pub fn attribute(handle: &ElementHandle, attribute: Attribute) -> Self {
        BridgeRequest::Attribute {
            cmd: "attribute",
            handle: handle.clone(),
            attribute,
        }
    }

    pub fn attributes(handle: &ElementHandle) -> Self {
        Self::on_handle("attributes", handle)
    }

    pub fn children(handle: &ElementHandle) -> Self {
        Self::on_handle("children", handle)
    }

    pub fn find_identifier(handle: &ElementHandle, identifier: &str, max_depth: usize) -> Self {
        BridgeRequest::FindIdentifier {
            cmd: "find_identifier",
            handle: handle.clone(),
            identifier: identifier.to_string(),
            max_depth,
        }
    }

    pub fn focus(handle: &ElementHandle) -> Self {
        Self::on_handle("focus", handle)
    }

    pub fn click(handle: &ElementHandle) -> Self {
        Self::on_handle("click", handle)
    }

    pub fn set_value(handle: &ElementHandle, value: &str) -> Self {
        Self::with_value("set_value", handle, value)
    }

    pub fn select(handle: &ElementHandle, value: &str) -> Self {
        Self::with_value("select", handle, value)
    }

    pub fn send_key(handle: &ElementHandle, key: &Keystroke) -> Self {
        BridgeRequest::SendKey {
            cmd: "send_key",
            handle: handle.clone(),
            key: key.clone(),
        }
    }

    pub fn quit() -> Self {
        BridgeRequest::Quit { cmd: "quit" }
    }

    fn on_handle(cmd: &'static str, handle: &ElementHandle) -> Self {
        BridgeRequest::Handle {
            cmd,
            handle: handle.clone(),
        }
    }

    fn with_value(cmd: &'static str, handle: &ElementHandle, value: &str) -> Self {
        BridgeRequest::WithValue {
            cmd,
            handle: handle.clone(),
            value: value.to_string(),
        }
    }
}

/// Response read from the helper's stdout (one JSON line).
#[derive(Debug, Default, Deserialize)]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Set when the helper does not implement the command
    #[serde(default)]
    pub unsupported: bool,
    /// Set when the handle no longer refers to a live element
    #[serde(default)]
    pub stale: bool,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub handle: Option<ElementHandle>,
    #[serde(default)]
    pub handles: Option<Vec<ElementHandle>>,
    #[serde(default)]
    pub attributes: Option<NodeAttributes>,
    #[serde(default)]
    pub value: Option<AttributeValue>,
}

/// Accessibility backend served by an external helper process.
///
/// Each platform ships a small helper that wraps its native accessibility API
/// (UI Automation, AX, AT-SPI) and speaks newline-delimited JSON: one request
/// per line on stdin, one response per line on stdout, with a
/// `{"ok":true,"ready":true}` line once it is ready.
pub struct BridgeBackend {
    command: String,
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl BridgeBackend {
    /// Spawn the helper and wait for its ready signal.
    pub fn launch(command: &str, args: &[String]) -> Result<Self, BackendError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BackendError::Spawn {
                command: command.to_string(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::Io(format!("Failed to capture stdin of {}", command)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Io(format!("Failed to capture stdout of {}", command)))?;

        let mut reader = BufReader::new(stdout);

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| BackendError::Io(format!("Failed to read ready signal: {}", e)))?;

        let response: BridgeResponse =
            serde_json::from_str(line.trim()).map_err(|e| BackendError::Json {
                context: format!("{} ready signal", command),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(BackendError::Protocol {
                command: "launch".into(),
                error: format!("Did not receive ready signal from {}", command),
            });
        }

        debug!(command, "accessibility bridge ready");

        Ok(BridgeBackend {
            command: command.to_string(),
            child,
            stdin,
            reader,
        })
    }

    fn send(&mut self, request: &BridgeRequest) -> Result<BridgeResponse, BackendError> {
        let json = serde_json::to_string(request).map_err(|e| BackendError::Json {
            context: "BridgeRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json).map_err(|e| {
            BackendError::Io(format!("Failed to write to {} stdin: {}", self.command, e))
        })?;

        self.stdin.flush().map_err(|e| {
            BackendError::Io(format!("Failed to flush {} stdin: {}", self.command, e))
        })?;

        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            BackendError::Io(format!("Failed to read from {} stdout: {}", self.command, e))
        })?;

        if line.trim().is_empty() {
            return Err(BackendError::Io(format!(
                "Empty response from {} (process may have died)",
                self.command
            )));
        }

        serde_json::from_str(line.trim()).map_err(|e| BackendError::Json {
            context: format!("{} response", self.command),
            source: e,
        })
    }

    /// Send a request and map a negative reply onto the error taxonomy.
    fn send_ok(
        &mut self,
        request: &BridgeRequest,
        command_name: &'static str,
    ) -> Result<BridgeResponse, BackendError> {
        let response = self.send(request)?;
        if response.ok {
            return Ok(response);
        }

        let error = response.error.unwrap_or_else(|| "Unknown error".into());
        if response.unsupported {
            return Err(BackendError::Unsupported(command_name));
        }
        if response.stale {
            return Err(BackendError::StaleHandle(error));
        }
        Err(BackendError::Protocol {
            command: command_name.into(),
            error,
        })
    }

    pub fn quit(&mut self) -> Result<(), BackendError> {
        // Best effort: the helper may already be gone
        let _ = self.send(&BridgeRequest::quit());
        let _ = self.child.wait();
        Ok(())
    }
}

impl AccessibilityBackend for BridgeBackend {
    fn root(&mut self, app: &str) -> Result<ElementHandle, BackendError> {
        let response = self
            .send_ok(&BridgeRequest::root(app), "root")
            .map_err(|e| BackendError::Connection {
                app: app.to_string(),
                reason: e.to_string(),
            })?;

        response.handle.ok_or_else(|| BackendError::Connection {
            app: app.to_string(),
            reason: "bridge returned no root handle".into(),
        })
    }

    fn read_attribute(
        &mut self,
        handle: &ElementHandle,
        attribute: Attribute,
    ) -> Result<Option<AttributeValue>, BackendError> {
        let response = self.send_ok(&BridgeRequest::attribute(handle, attribute), "attribute")?;
        Ok(response.value)
    }

    fn read_attributes(&mut self, handle: &ElementHandle) -> Result<NodeAttributes, BackendError> {
        match self.send_ok(&BridgeRequest::attributes(handle), "attributes") {
            Ok(response) => Ok(response.attributes.unwrap_or_default()),
            Err(BackendError::Unsupported(_)) => {
                // Older helpers only answer single-attribute reads
                let mut attrs = NodeAttributes::default();
                for attribute in Attribute::ALL {
                    match self.read_attribute(handle, attribute) {
                        Ok(Some(value)) => attrs.set(attribute, value),
                        Ok(None) => {}
                        Err(e) => warn!(%handle, ?attribute, error = %e, "attribute unreadable"),
                    }
                }
                Ok(attrs)
            }
            Err(e) => Err(e),
        }
    }

    fn children(&mut self, handle: &ElementHandle) -> Result<Vec<ElementHandle>, BackendError> {
        let response = self.send_ok(&BridgeRequest::children(handle), "children")?;
        Ok(response.handles.unwrap_or_default())
    }

    fn find_by_identifier(
        &mut self,
        root: &ElementHandle,
        identifier: &str,
        max_depth: usize,
    ) -> Result<Option<ElementHandle>, BackendError> {
        let response = self.send_ok(
            &BridgeRequest::find_identifier(root, identifier, max_depth),
            "find_identifier",
        )?;
        Ok(response.handle)
    }

    fn focus(&mut self, handle: &ElementHandle) -> Result<(), BackendError> {
        self.send_ok(&BridgeRequest::focus(handle), "focus")?;
        Ok(())
    }

    fn set_value(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError> {
        self.send_ok(&BridgeRequest::set_value(handle, value), "set_value")?;
        Ok(())
    }

    fn click(&mut self, handle: &ElementHandle) -> Result<(), BackendError> {
        self.send_ok(&BridgeRequest::click(handle), "click")?;
        Ok(())
    }

    fn select(&mut self, handle: &ElementHandle, value: &str) -> Result<(), BackendError> {
        self.send_ok(&BridgeRequest::select(handle, value), "select")?;
        Ok(())
    }

    fn send_key(&mut self, container: &ElementHandle, key: &Keystroke) -> Result<(), BackendError> {
        self.send_ok(&BridgeRequest::send_key(container, key), "send_key")?;
        Ok(())
    }
}

impl Drop for BridgeBackend {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
