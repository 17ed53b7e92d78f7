use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::de_number;

/// Order placed by the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub reference: String,
    pub status: OrderStatus,
    #[serde(deserialize_with = "de_number")]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Present once the eSIM has been provisioned.
    #[serde(default, alias = "esim_detail")]
    pub esim: Option<EsimDetail>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Order {
    pub fn is_provisioned(&self) -> bool {
        self.esim.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
    Other(String),
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" | "processing" => OrderStatus::Pending,
            "completed" | "paid" => OrderStatus::Completed,
            "failed" => OrderStatus::Failed,
            "refunded" => OrderStatus::Refunded,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => "pending".to_string(),
            OrderStatus::Completed => "completed".to_string(),
            OrderStatus::Failed => "failed".to_string(),
            OrderStatus::Refunded => "refunded".to_string(),
            OrderStatus::Cancelled => "cancelled".to_string(),
            OrderStatus::Other(other) => other,
        }
    }
}

/// Activation details of a provisioned eSIM. Generated server-side; the
/// client only displays them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsimDetail {
    pub iccid: String,
    /// LPA string encoded in the activation QR code, e.g. `LPA:1$smdp.example.com$CODE`.
    #[serde(default, alias = "qr_code")]
    pub qr_payload: Option<String>,
    #[serde(default)]
    pub activation_code: Option<String>,
    #[serde(default)]
    pub smdp_address: Option<String>,
    #[serde(default)]
    pub apn: Option<ApnSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnSettings {
    #[serde(alias = "apn")]
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// SM-DP+ address and matching ID for manual eSIM installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualActivation {
    pub smdp_address: String,
    pub activation_code: String,
}

impl EsimDetail {
    /// Details for entering the eSIM by hand when the QR code can't be scanned.
    ///
    /// Explicit fields win; otherwise they are read from the LPA string.
    pub fn manual_activation(&self) -> Option<ManualActivation> {
        if let (Some(smdp), Some(code)) = (&self.smdp_address, &self.activation_code) {
            return Some(ManualActivation {
                smdp_address: smdp.clone(),
                activation_code: code.clone(),
            });
        }

        let payload = self.qr_payload.as_deref()?;
        let mut fields = payload.strip_prefix("LPA:")?.split('$');
        let _version = fields.next()?;
        let smdp = fields.next().filter(|s| !s.is_empty())?;
        let code = fields.next().unwrap_or_default();

        Some(ManualActivation {
            smdp_address: smdp.to_string(),
            activation_code: code.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_order_with_esim() {
        let order: Order = serde_json::from_value(json!({
            "id": 12,
            "reference": "ORD-0012",
            "status": "completed",
            "amount": "9.99",
            "created_at": "2024-05-01T10:00:00.000000Z",
            "esim": {
                "iccid": "8944500000000000001",
                "qr_code": "LPA:1$smdp.example.com$K2-ABC",
                "apn": {"apn": "globaldata"}
            }
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.is_provisioned());
        let esim = order.esim.unwrap();
        assert_eq!(esim.apn.as_ref().map(|apn| apn.name.as_str()), Some("globaldata"));
        assert_eq!(
            esim.manual_activation(),
            Some(ManualActivation {
                smdp_address: "smdp.example.com".into(),
                activation_code: "K2-ABC".into(),
            })
        );
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status: OrderStatus = serde_json::from_value(json!("on_hold")).unwrap();
        assert_eq!(status, OrderStatus::Other("on_hold".into()));
    }

    #[test]
    fn manual_activation_needs_an_address() {
        let esim = EsimDetail {
            iccid: "1".into(),
            qr_payload: Some("LPA:1$$".into()),
            activation_code: None,
            smdp_address: None,
            apn: None,
        };
        assert_eq!(esim.manual_activation(), None);
    }
}
