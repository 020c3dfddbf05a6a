//! Third-party link and lookup helpers: ViaCEP postal-code resolution,
//! Google Maps URLs, and WhatsApp deep links.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("CEP inválido: informe 8 dígitos")]
    InvalidCep,
    #[error("CEP não encontrado")]
    NotFound,
    #[error("falha na consulta: {0}")]
    Http(#[from] reqwest::Error),
}

/// Strip non-digits and require exactly eight of them.
pub fn normalize_cep(raw: &str) -> Result<String, LookupError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return Err(LookupError::InvalidCep);
    }
    Ok(digits)
}

#[derive(Debug, Default, Deserialize)]
pub struct ViaCepResponse {
    #[serde(default)]
    pub logradouro: String,
    #[serde(default)]
    pub bairro: String,
    #[serde(default)]
    pub localidade: String,
    #[serde(default)]
    pub uf: String,
    #[serde(default)]
    pub cep: String,
    /// ViaCEP answers 200 with `"erro": true` for unknown codes.
    #[serde(default)]
    pub erro: bool,
}

/// Resolve a postal code against ViaCEP. Blocking; called from the form
/// handler, which is fine for a single-threaded TUI.
pub fn fetch_address(raw_cep: &str) -> Result<String, LookupError> {
    let cep = normalize_cep(raw_cep)?;
    let url = format!("https://viacep.com.br/ws/{cep}/json/");
    let response: ViaCepResponse = reqwest::blocking::get(&url)?.json()?;
    if response.erro {
        return Err(LookupError::NotFound);
    }
    Ok(format_address(&response))
}

/// Concatenate the ViaCEP fields into a single address line, skipping the
/// separators of absent fields.
pub fn format_address(r: &ViaCepResponse) -> String {
    let city = match (r.localidade.is_empty(), r.uf.is_empty()) {
        (false, false) => format!("{} - {}", r.localidade, r.uf),
        (false, true) => r.localidade.clone(),
        (true, false) => r.uf.clone(),
        (true, true) => String::new(),
    };

    let mut parts: Vec<String> = Vec::new();
    if !r.logradouro.is_empty() {
        parts.push(r.logradouro.clone());
    }
    if !r.bairro.is_empty() {
        parts.push(r.bairro.clone());
    }
    if !city.is_empty() {
        parts.push(city);
    }
    if !r.cep.is_empty() {
        parts.push(format!("CEP: {}", r.cep));
    }
    parts.join(", ")
}

// encodeURIComponent leaves these unescaped on top of alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Keyless embedded-map URL for an address.
pub fn maps_embed_url(address: &str) -> String {
    format!(
        "https://www.google.com/maps?q={}&output=embed",
        encode_component(address)
    )
}

/// Regular Google Maps search URL for an address.
pub fn maps_search_url(address: &str) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        encode_component(address)
    )
}

/// WhatsApp deep link from a free-form phone number.
pub fn whatsapp_url(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("https://wa.me/{digits}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_cep_strips_punctuation() {
        assert_eq!(normalize_cep("15700-000").unwrap(), "15700000");
        assert_eq!(normalize_cep(" 15.700-000 ").unwrap(), "15700000");
    }

    #[test]
    fn normalize_cep_rejects_wrong_length() {
        assert!(matches!(normalize_cep("1570"), Err(LookupError::InvalidCep)));
        assert!(matches!(
            normalize_cep("157000001"),
            Err(LookupError::InvalidCep)
        ));
        assert!(matches!(normalize_cep(""), Err(LookupError::InvalidCep)));
        assert!(matches!(
            normalize_cep("abcdefgh"),
            Err(LookupError::InvalidCep)
        ));
    }

    #[test]
    fn format_address_full_response() {
        let r = ViaCepResponse {
            logradouro: "Rua Oito".into(),
            bairro: "Centro".into(),
            localidade: "Jales".into(),
            uf: "SP".into(),
            cep: "15700-000".into(),
            erro: false,
        };
        assert_eq!(
            format_address(&r),
            "Rua Oito, Centro, Jales - SP, CEP: 15700-000"
        );
    }

    #[test]
    fn format_address_skips_missing_fields() {
        // Rural codes often come back without street or district.
        let r = ViaCepResponse {
            localidade: "Jales".into(),
            uf: "SP".into(),
            cep: "15700-000".into(),
            ..ViaCepResponse::default()
        };
        assert_eq!(format_address(&r), "Jales - SP, CEP: 15700-000");
    }

    #[test]
    fn format_address_missing_uf_leaves_no_dangling_separator() {
        let r = ViaCepResponse {
            localidade: "Jales".into(),
            cep: "15700-000".into(),
            ..ViaCepResponse::default()
        };
        assert_eq!(format_address(&r), "Jales, CEP: 15700-000");

        let r = ViaCepResponse {
            uf: "SP".into(),
            cep: "15700-000".into(),
            ..ViaCepResponse::default()
        };
        assert_eq!(format_address(&r), "SP, CEP: 15700-000");
    }

    #[test]
    fn unknown_cep_flag_deserializes() {
        let r: ViaCepResponse = serde_json::from_str("{\"erro\": true}").unwrap();
        assert!(r.erro);
        let r: ViaCepResponse =
            serde_json::from_str("{\"localidade\": \"Jales\", \"uf\": \"SP\"}").unwrap();
        assert!(!r.erro);
    }

    #[test]
    fn maps_urls_percent_encode_the_address() {
        let addr = "Rua Oito, Centro, Jales - SP";
        assert_eq!(
            maps_embed_url(addr),
            "https://www.google.com/maps?q=Rua%20Oito%2C%20Centro%2C%20Jales%20-%20SP&output=embed"
        );
        assert_eq!(
            maps_search_url(addr),
            "https://www.google.com/maps/search/?api=1&query=Rua%20Oito%2C%20Centro%2C%20Jales%20-%20SP"
        );
    }

    #[test]
    fn maps_urls_encode_utf8() {
        assert!(maps_embed_url("São Paulo").contains("S%C3%A3o%20Paulo"));
    }

    #[test]
    fn whatsapp_url_strips_formatting() {
        assert_eq!(
            whatsapp_url("(17) 98765-4321"),
            "https://wa.me/17987654321"
        );
        assert_eq!(whatsapp_url("+55 17 98765 4321"), "https://wa.me/5517987654321");
    }
}
