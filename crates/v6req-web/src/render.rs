//! HTML page

use crate::PageData;
use std::fmt::Write;
use v6req_core::AsnDetails;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 20px; }
.container { max-width: 600px; margin: auto; padding: 20px; border: 1px solid #ccc; border-radius: 8px; }
h1 { text-align: center; color: #333; }
form { display: flex; flex-direction: column; gap: 10px; margin-bottom: 20px; }
input[type=\"text\"] { padding: 8px; border: 1px solid #ddd; border-radius: 4px; }
input[type=\"submit\"] { padding: 10px 15px; background-color: #007bff; color: white; border: none; border-radius: 4px; }
.error { color: red; font-weight: bold; }
.info { color: #555; }
.auto-detected { background-color: #e7f3ff; border: 1px solid #b3d9ff; padding: 15px; border-radius: 5px; margin-bottom: 20px; }
.detail-item { padding: 8px 12px; border-left: 4px solid #007bff; margin: 6px 0; }
.detail-label { font-weight: bold; color: #495057; font-size: 0.9em; }
.message-box { background-color: #f9f9f9; border: 1px solid #eee; padding: 15px; border-radius: 5px; white-space: pre-wrap; line-height: 1.6; }
ul { list-style-type: none; padding: 0; }
";

/// Escape text for use in HTML content and quoted attributes
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the full page
pub fn render_page(page: &PageData) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Does your provider support IPv6?</title>\n<style>\n");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"container\">\n");
    html.push_str("<h1>Does your provider support IPv6?</h1>\n");

    render_connection(&mut html, page);
    render_form(&mut html, page);

    if let Some(error) = &page.error {
        let _ = writeln!(html, "<p class=\"error\">Error: {}</p>", escape_html(error));
    } else if let Some(prefixes) = &page.prefixes {
        let _ = writeln!(html, "<h2>Results for ASN {}:</h2>", escape_html(&page.asn));
        if let Some(details) = &page.details {
            render_details(&mut html, details);
        }
        render_prefixes(&mut html, &page.asn, prefixes);
        if let Some(message) = &page.message {
            html.push_str("<h3>IPv6 Request Message</h3>\n");
            let _ = writeln!(
                html,
                "<div class=\"message-box\">{}</div>",
                escape_html(message)
            );
        }
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_connection(html: &mut String, page: &PageData) {
    let Some(source_ip) = &page.source_ip else {
        return;
    };

    html.push_str("<div class=\"auto-detected\">\n");
    match page.detected_asn {
        Some(asn) => {
            html.push_str("<h3>Auto-detected Information</h3>\n");
            let _ = writeln!(
                html,
                "<p><strong>Your IP:</strong> {} <strong>ASN:</strong> {} ({})</p>",
                escape_html(source_ip),
                asn.number(),
                escape_html(page.asn_name.as_deref().unwrap_or_default())
            );
            html.push_str(
                "<p class=\"info\">We've automatically detected your ISP's ASN based on your IP \
                 address. You can use this or enter a different ASN below.</p>\n",
            );
        }
        None => {
            html.push_str("<h3>Your Connection</h3>\n");
            let _ = writeln!(html, "<p><strong>Your IP:</strong> {}</p>", escape_html(source_ip));
            html.push_str(
                "<p class=\"info\">Unable to automatically detect ASN for your IP. Please enter \
                 an ASN manually below.</p>\n",
            );
        }
    }
    html.push_str("</div>\n");
}

fn render_form(html: &mut String, page: &PageData) {
    let hint = if page.auto_detected() {
        " or use auto-detected"
    } else {
        ""
    };
    let _ = write!(
        html,
        "<form method=\"POST\" action=\"/\">\n\
         <label for=\"asn\">Enter ASN (e.g., 19625){}:</label>\n\
         <input type=\"text\" id=\"asn\" name=\"asn\" value=\"{}\" required>\n\
         <input type=\"submit\" value=\"Lookup IPv6 Prefixes\">\n\
         </form>\n",
        hint,
        escape_html(&page.asn)
    );
}

fn detail_item(html: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        html,
        "<div class=\"detail-item\"><div class=\"detail-label\">{}</div><div>{}</div></div>",
        label,
        escape_html(value)
    );
}

fn detail_list(html: &mut String, label: &str, values: &[String], mailto: bool) {
    if values.is_empty() {
        return;
    }
    let _ = write!(
        html,
        "<div class=\"detail-item\"><div class=\"detail-label\">{}</div><ul>",
        label
    );
    for value in values {
        let value = escape_html(value);
        if mailto {
            let _ = write!(html, "<li><a href=\"mailto:{0}\">{0}</a></li>", value);
        } else {
            let _ = write!(html, "<li>{}</li>", value);
        }
    }
    html.push_str("</ul></div>\n");
}

fn render_details(html: &mut String, details: &AsnDetails) {
    html.push_str("<details>\n<summary>AS Organization Details</summary>\n");
    detail_item(html, "ASN", &details.asn.number().to_string());
    detail_item(html, "Organization Name", &details.name);

    let optional = [
        ("Description", &details.short_description),
        ("Country", &details.country_code),
        ("Traffic Ratio", &details.traffic_ratio),
        ("Regional Internet Registry", &details.rir_allocation),
        ("IANA Assignment", &details.iana_assignment),
        ("WHOIS Server", &details.whois_server),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            detail_item(html, label, value);
        }
    }

    if let Some(website) = &details.website {
        if is_web_url(website) {
            let website = escape_html(website.trim());
            let _ = writeln!(
                html,
                "<div class=\"detail-item\"><div class=\"detail-label\">Website</div>\
                 <div><a href=\"{0}\" target=\"_blank\" rel=\"noopener\">{0}</a></div></div>",
                website
            );
        } else {
            detail_item(html, "Website", website);
        }
    }

    detail_list(html, "Address", &details.owner_address, false);
    detail_list(html, "Email Contacts", &details.email_contacts, true);
    detail_list(html, "Abuse Contacts", &details.abuse_contacts, true);

    if let Some(updated) = &details.date_updated {
        detail_item(html, "Last Updated", updated);
    }
    html.push_str("</details>\n");
}

/// Upstream values only become links when they are plain http(s) URLs
fn is_web_url(value: &str) -> bool {
    let value = value.trim();
    ["http://", "https://"].iter().any(|scheme| {
        value.len() > scheme.len()
            && value
                .get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn render_prefixes(html: &mut String, asn: &str, prefixes: &[String]) {
    if prefixes.is_empty() {
        let _ = writeln!(
            html,
            "<p class=\"info\">No IPv6 prefixes registered for ASN {}.</p>",
            escape_html(asn)
        );
        return;
    }

    html.push_str("<h3>IPv6 Prefixes</h3>\n<ul>\n");
    for prefix in prefixes {
        let _ = writeln!(html, "<li>{}</li>", escape_html(prefix));
    }
    html.push_str("</ul>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use v6req_core::Asn;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">O'Neil & Co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#39;Neil &amp; Co&lt;/a&gt;"
        );
    }

    #[test]
    fn test_get_without_detection() {
        let page = PageData {
            source_ip: Some("192.0.2.1".to_string()),
            ..PageData::default()
        };
        let html = render_page(&page);

        assert!(html.contains("Unable to automatically detect ASN"));
        assert!(html.contains("value=\"\""));
        assert!(!html.contains("Results for ASN"));
    }

    #[test]
    fn test_auto_detected_prefills_form() {
        let page = PageData {
            asn: "64500".to_string(),
            source_ip: Some("192.0.2.1".to_string()),
            detected_asn: Some(Asn(64500)),
            asn_name: Some("EXAMPLE-NET".to_string()),
            ..PageData::default()
        };
        let html = render_page(&page);

        assert!(html.contains("Auto-detected Information"));
        assert!(html.contains("<strong>ASN:</strong> 64500 (EXAMPLE-NET)"));
        assert!(html.contains("or use auto-detected"));
        assert!(html.contains("value=\"64500\""));
    }

    #[test]
    fn test_results_with_details_and_prefixes() {
        let details = AsnDetails {
            asn: Asn(64500),
            name: "EXAMPLE-NET".to_string(),
            website: Some("https://example.net".to_string()),
            email_contacts: vec!["noc@example.net".to_string()],
            ..AsnDetails::default()
        };
        let page = PageData {
            asn: "64500".to_string(),
            prefixes: Some(vec!["2001:db8::/32".to_string()]),
            details: Some(details),
            message: Some("I am a current customer".to_string()),
            ..PageData::default()
        };
        let html = render_page(&page);

        assert!(html.contains("Results for ASN 64500:"));
        assert!(html.contains("<li>2001:db8::/32</li>"));
        assert!(html.contains("href=\"mailto:noc@example.net\""));
        assert!(html.contains("href=\"https://example.net\""));
        assert!(!html.contains("Traffic Ratio"));
        assert!(html.contains("I am a current customer"));
    }

    #[test]
    fn test_website_link_requires_web_scheme() {
        assert!(is_web_url("https://example.net"));
        assert!(is_web_url(" HTTP://example.net/peering "));
        assert!(!is_web_url("https://"));
        assert!(!is_web_url("javascript:alert(1)"));
        assert!(!is_web_url("data:text/html,hi"));
        assert!(!is_web_url("example.net"));
    }

    #[test]
    fn test_script_website_is_plain_text() {
        let details = AsnDetails {
            asn: Asn(64500),
            name: "EXAMPLE-NET".to_string(),
            website: Some("javascript:alert(document.cookie)".to_string()),
            ..AsnDetails::default()
        };
        let page = PageData {
            asn: "64500".to_string(),
            prefixes: Some(Vec::new()),
            details: Some(details),
            ..PageData::default()
        };
        let html = render_page(&page);

        assert!(!html.contains("href=\"javascript:"));
        assert!(html.contains("<div>javascript:alert(document.cookie)</div>"));
    }

    #[test]
    fn test_empty_prefixes_note() {
        let page = PageData {
            asn: "64501".to_string(),
            prefixes: Some(Vec::new()),
            ..PageData::default()
        };
        let html = render_page(&page);
        assert!(html.contains("No IPv6 prefixes registered for ASN 64501."));
    }

    #[test]
    fn test_error_hides_results() {
        let page = PageData {
            asn: "<script>".to_string(),
            error: Some("Invalid ASN: <script>".to_string()),
            ..PageData::default()
        };
        let html = render_page(&page);

        assert!(html.contains("Error: Invalid ASN: &lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Results for ASN"));
    }
}
