//! 内容分发：把 code 的内容映射为跳转目标

use urlencoding::encode;

use crate::errors::{QrlinkerError, Result};
use crate::storage::ContentPayload;

/// 分发结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// 直接跳转到该地址
    Redirect(String),
    /// 交给落地页渲染
    Landing,
}

/// 按内容类型计算目标
///
/// `destination_url` 是 code 上配置的直接跳转地址，优先于 payload 中的 URL。
pub fn dispatch(
    payload: &ContentPayload,
    destination_url: Option<&str>,
    landing_page: bool,
) -> Result<Dispatch> {
    match payload {
        ContentPayload::Url { url } => {
            direct(destination_url.or(url.as_deref()), landing_page, "url")
        }
        ContentPayload::File { url } => {
            direct(destination_url.or(Some(url.as_str())), landing_page, "file")
        }

        ContentPayload::Phone { phone } => Ok(Dispatch::Redirect(format!(
            "tel:{}",
            dial_string(phone, "phone")?
        ))),
        ContentPayload::Sms { phone, message } => {
            let mut uri = format!("sms:{}", dial_string(phone, "sms")?);
            if let Some(body) = non_empty(message) {
                uri.push_str("?body=");
                uri.push_str(&encode(body));
            }
            Ok(Dispatch::Redirect(uri))
        }
        ContentPayload::Email {
            email,
            subject,
            body,
        } => {
            let address = email.trim();
            if address.is_empty() {
                return Err(QrlinkerError::malformed_content("email content without address"));
            }
            let params: Vec<String> = [("subject", subject), ("body", body)]
                .into_iter()
                .filter_map(|(key, value)| non_empty(value).map(|v| format!("{}={}", key, encode(v))))
                .collect();

            let mut uri = format!("mailto:{}", address);
            if !params.is_empty() {
                uri.push('?');
                uri.push_str(&params.join("&"));
            }
            Ok(Dispatch::Redirect(uri))
        }
        ContentPayload::Whatsapp { phone, message } => {
            // wa.me 只接受纯数字号码
            let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
            if digits.is_empty() {
                return Err(QrlinkerError::malformed_content(
                    "whatsapp content without a phone number",
                ));
            }
            let mut uri = format!("https://wa.me/{}", digits);
            if let Some(text) = non_empty(message) {
                uri.push_str("?text=");
                uri.push_str(&encode(text));
            }
            Ok(Dispatch::Redirect(uri))
        }

        ContentPayload::Wifi { .. }
        | ContentPayload::Vcard { .. }
        | ContentPayload::Text { .. }
        | ContentPayload::Event { .. } => Ok(Dispatch::Landing),
    }
}

fn direct(target: Option<&str>, landing_page: bool, content_type: &str) -> Result<Dispatch> {
    if landing_page {
        return Ok(Dispatch::Landing);
    }
    match target.map(str::trim).filter(|t| !t.is_empty()) {
        Some(target) => Ok(Dispatch::Redirect(target.to_string())),
        None => Err(QrlinkerError::malformed_content(format!(
            "{} content has no destination",
            content_type
        ))),
    }
}

/// 号码去掉空白，空号码视为内容损坏
fn dial_string(phone: &str, content_type: &str) -> Result<String> {
    let number: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if number.is_empty() {
        return Err(QrlinkerError::malformed_content(format!(
            "{} content without a phone number",
            content_type
        )));
    }
    Ok(number)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect(payload: ContentPayload) -> String {
        match dispatch(&payload, None, false).unwrap() {
            Dispatch::Redirect(uri) => uri,
            Dispatch::Landing => panic!("expected redirect"),
        }
    }

    #[test]
    fn test_sms_with_message() {
        let uri = redirect(ContentPayload::Sms {
            phone: "+1234567890".to_string(),
            message: Some("Hi there".to_string()),
        });
        assert_eq!(uri, "sms:+1234567890?body=Hi%20there");
    }

    #[test]
    fn test_sms_without_message() {
        let uri = redirect(ContentPayload::Sms {
            phone: "+1 234 567 890".to_string(),
            message: Some(String::new()),
        });
        assert_eq!(uri, "sms:+1234567890");
    }

    #[test]
    fn test_phone() {
        let uri = redirect(ContentPayload::Phone {
            phone: "+44 20 7946 0958".to_string(),
        });
        assert_eq!(uri, "tel:+442079460958");
    }

    #[test]
    fn test_email_params() {
        let uri = redirect(ContentPayload::Email {
            email: "hello@example.com".to_string(),
            subject: Some("Order #12 & more".to_string()),
            body: None,
        });
        assert_eq!(uri, "mailto:hello@example.com?subject=Order%20%2312%20%26%20more");

        let uri = redirect(ContentPayload::Email {
            email: "hello@example.com".to_string(),
            subject: Some("Hi".to_string()),
            body: Some("See you".to_string()),
        });
        assert_eq!(uri, "mailto:hello@example.com?subject=Hi&body=See%20you");

        let uri = redirect(ContentPayload::Email {
            email: "hello@example.com".to_string(),
            subject: None,
            body: None,
        });
        assert_eq!(uri, "mailto:hello@example.com");
    }

    #[test]
    fn test_whatsapp_digits_only() {
        let uri = redirect(ContentPayload::Whatsapp {
            phone: "+1 (234) 567-890".to_string(),
            message: Some("Hola!".to_string()),
        });
        assert_eq!(uri, "https://wa.me/1234567890?text=Hola%21");
    }

    #[test]
    fn test_direct_precedence() {
        let payload = ContentPayload::Url {
            url: Some("https://payload.example.com".to_string()),
        };
        assert_eq!(
            dispatch(&payload, Some("https://dest.example.com/a?b=c"), false).unwrap(),
            Dispatch::Redirect("https://dest.example.com/a?b=c".to_string())
        );
        assert_eq!(
            dispatch(&payload, None, false).unwrap(),
            Dispatch::Redirect("https://payload.example.com".to_string())
        );
        assert_eq!(dispatch(&payload, None, true).unwrap(), Dispatch::Landing);
    }

    #[test]
    fn test_file_uses_payload_url() {
        let payload = ContentPayload::File {
            url: "https://cdn.example.com/menu.pdf".to_string(),
        };
        assert_eq!(
            dispatch(&payload, None, false).unwrap(),
            Dispatch::Redirect("https://cdn.example.com/menu.pdf".to_string())
        );
    }

    #[test]
    fn test_landing_types() {
        let payloads = [
            ContentPayload::Text {
                text: "hello".to_string(),
            },
            ContentPayload::Vcard {
                first_name: "Ada".to_string(),
                last_name: None,
                organization: None,
                phone: None,
                email: None,
                website: None,
            },
        ];
        for payload in payloads {
            assert_eq!(dispatch(&payload, None, false).unwrap(), Dispatch::Landing);
        }
    }

    #[test]
    fn test_missing_destination_is_malformed() {
        let err = dispatch(&ContentPayload::Url { url: None }, None, false).unwrap_err();
        assert!(matches!(err, QrlinkerError::MalformedContent(_)));

        let err = dispatch(
            &ContentPayload::Whatsapp {
                phone: "n/a".to_string(),
                message: None,
            },
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, QrlinkerError::MalformedContent(_)));
    }
}
