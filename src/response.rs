use serde::Serialize;

/// `{"ok": bool, "data"?: any, "error"?: string}`, the shape of every response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

impl Envelope<()> {
    pub fn ok() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes() {
        assert_eq!(serde_json::to_value(Envelope::ok()).unwrap(), json!({"ok": true}));
        assert_eq!(
            serde_json::to_value(Envelope::data(vec![1, 2])).unwrap(),
            json!({"ok": true, "data": [1, 2]})
        );
        assert_eq!(
            serde_json::to_value(Envelope::error("db error")).unwrap(),
            json!({"ok": false, "error": "db error"})
        );
    }
}
