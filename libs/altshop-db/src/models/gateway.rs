use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};

use super::common::{Currency, nullable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_gateway_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentGatewayType {
    TelegramStars,
    Yookassa,
    Yoomoney,
    Cryptomus,
    Heleket,
    Cryptopay,
    Robokassa,
    Pal24,
    Wata,
    Platega,
}

/// A credential key a gateway needs before it can take payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    ApiKey,
    SecretKey,
    ShopId,
}

impl PaymentGatewayType {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentGatewayType::TelegramStars => "Telegram Stars",
            PaymentGatewayType::Yookassa => "YooKassa",
            PaymentGatewayType::Yoomoney => "YooMoney",
            PaymentGatewayType::Cryptomus => "Cryptomus",
            PaymentGatewayType::Heleket => "Heleket",
            PaymentGatewayType::Cryptopay => "CryptoPay",
            PaymentGatewayType::Robokassa => "Robokassa",
            PaymentGatewayType::Pal24 => "Pal24",
            PaymentGatewayType::Wata => "Wata",
            PaymentGatewayType::Platega => "Platega",
        }
    }

    pub fn required_credentials(&self) -> &'static [Credential] {
        use Credential::*;
        match self {
            PaymentGatewayType::TelegramStars => &[],
            PaymentGatewayType::Yookassa | PaymentGatewayType::Robokassa => &[ShopId, SecretKey],
            PaymentGatewayType::Yoomoney
            | PaymentGatewayType::Heleket
            | PaymentGatewayType::Cryptopay
            | PaymentGatewayType::Wata => &[ApiKey],
            PaymentGatewayType::Cryptomus | PaymentGatewayType::Pal24 | PaymentGatewayType::Platega => {
                &[ApiKey, ShopId]
            }
        }
    }
}

/// Credentials blob. Gateway-specific keys beyond the common three are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_configure: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GatewaySettings {
    pub fn credential(&self, key: Credential) -> Option<&str> {
        let value = match key {
            Credential::ApiKey => self.api_key.as_deref(),
            Credential::SecretKey => self.secret_key.as_deref(),
            Credential::ShopId => self.shop_id.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Overlays every key present in `patch`, leaving the rest untouched. An explicit `null`
    /// clears the key.
    pub fn merge(&mut self, patch: GatewaySettingsPatch) {
        let GatewaySettingsPatch { api_key, secret_key, shop_id, mut extra } = patch;
        if let Some(value) = api_key {
            self.api_key = value;
        }
        if let Some(value) = secret_key {
            self.secret_key = value;
        }
        if let Some(value) = shop_id {
            self.shop_id = value;
        }
        // Derived on every write, never taken from the client.
        extra.remove("is_configure");
        self.extra.extend(extra);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettingsPatch {
    #[serde(default, deserialize_with = "nullable")]
    pub api_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub secret_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub shop_id: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Whether a gateway has every credential its type needs. A missing blob is never configured.
pub fn is_configured(kind: PaymentGatewayType, settings: Option<&GatewaySettings>) -> bool {
    match settings {
        None => false,
        Some(settings) => kind
            .required_credentials()
            .iter()
            .all(|key| settings.credential(*key).is_some()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentGateway {
    pub id: i32,
    pub order_index: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: PaymentGatewayType,
    pub currency: Currency,
    pub is_active: bool,
    pub settings: Option<Json<GatewaySettings>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayView {
    #[serde(flatten)]
    pub gateway: PaymentGateway,
    pub label: &'static str,
}

impl From<PaymentGateway> for GatewayView {
    fn from(gateway: PaymentGateway) -> Self {
        let label = gateway.kind.label();
        GatewayView { gateway, label }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGateway {
    pub is_active: Option<bool>,
    pub order_index: Option<i32>,
    pub currency: Option<Currency>,
    pub settings: Option<GatewaySettings>,
}

impl UpdateGateway {
    pub fn apply(self, gateway: &mut PaymentGateway) {
        if let Some(active) = self.is_active {
            gateway.is_active = active;
        }
        if let Some(index) = self.order_index {
            gateway.order_index = index;
        }
        if let Some(currency) = self.currency {
            gateway.currency = currency;
        }
        if let Some(settings) = self.settings {
            gateway.settings = Some(Json(settings));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(api: Option<&str>, secret: Option<&str>, shop: Option<&str>) -> GatewaySettings {
        GatewaySettings {
            api_key: api.map(String::from),
            secret_key: secret.map(String::from),
            shop_id: shop.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn stars_only_needs_a_blob() {
        assert!(is_configured(PaymentGatewayType::TelegramStars, Some(&GatewaySettings::default())));
        assert!(!is_configured(PaymentGatewayType::TelegramStars, None));
    }

    #[test]
    fn shop_and_secret_gateways() {
        for kind in [PaymentGatewayType::Yookassa, PaymentGatewayType::Robokassa] {
            assert!(is_configured(kind, Some(&creds(None, Some("s"), Some("1")))));
            assert!(!is_configured(kind, Some(&creds(Some("k"), None, Some("1")))));
        }
    }

    #[test]
    fn api_key_gateways() {
        for kind in [
            PaymentGatewayType::Yoomoney,
            PaymentGatewayType::Heleket,
            PaymentGatewayType::Cryptopay,
            PaymentGatewayType::Wata,
        ] {
            assert!(is_configured(kind, Some(&creds(Some("k"), None, None))));
            assert!(!is_configured(kind, Some(&creds(Some(""), None, None))));
        }
    }

    #[test]
    fn api_key_and_shop_gateways() {
        for kind in [PaymentGatewayType::Cryptomus, PaymentGatewayType::Pal24, PaymentGatewayType::Platega] {
            assert!(is_configured(kind, Some(&creds(Some("k"), None, Some("shop")))));
            assert!(!is_configured(kind, Some(&creds(Some("k"), None, None))));
        }
    }

    #[test]
    fn merge_keeps_untouched_and_extra_keys() {
        let mut current: GatewaySettings =
            serde_json::from_value(serde_json::json!({"api_key": "old", "shop_id": "7", "webhook": "x"})).unwrap();
        let patch: GatewaySettingsPatch =
            serde_json::from_value(serde_json::json!({"api_key": "new", "region": "eu"})).unwrap();
        current.merge(patch);

        assert_eq!(current.api_key.as_deref(), Some("new"));
        assert_eq!(current.shop_id.as_deref(), Some("7"));
        assert_eq!(current.extra["webhook"], "x");
        assert_eq!(current.extra["region"], "eu");
    }

    #[test]
    fn explicit_null_clears_a_credential() {
        let mut current = creds(Some("k"), Some("s"), Some("1"));
        let patch: GatewaySettingsPatch =
            serde_json::from_value(serde_json::json!({"secret_key": null, "is_configure": true})).unwrap();
        current.merge(patch);

        assert_eq!(current.api_key.as_deref(), Some("k"));
        assert_eq!(current.secret_key, None);
        assert_eq!(current.shop_id.as_deref(), Some("1"));
        assert!(!current.extra.contains_key("is_configure"));
        assert!(!is_configured(PaymentGatewayType::Yookassa, Some(&current)));
    }

    #[test]
    fn view_carries_label() {
        let gw = PaymentGateway {
            id: 1,
            order_index: 0,
            kind: PaymentGatewayType::Cryptopay,
            currency: Currency::Usd,
            is_active: false,
            settings: None,
        };
        let json = serde_json::to_value(GatewayView::from(gw)).unwrap();
        assert_eq!(json["label"], "CryptoPay");
        assert_eq!(json["type"], "CRYPTOPAY");
        assert_eq!(json["order_index"], 0);
    }
}
