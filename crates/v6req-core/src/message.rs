//! Advocacy message a customer can send to their provider

const ADOPTION_TRENDS_URL: &str = "https://stats.ipv6.army/?page=Historical%20Trends";

/// First-request guides of the five Regional Internet Registries
pub const RIR_IPV6_GUIDES: [(&str, &str); 5] = [
    ("ARIN", "https://www.arin.net/resources/guide/ipv6/first_request/"),
    ("RIPE NCC", "https://www.ripe.net/manage-ips-and-asns/ipv6/request-ipv6/"),
    ("APNIC", "https://www.apnic.net/community/ipv6/get-ipv6/"),
    (
        "AFRINIC",
        "https://afrinic.net/support/resource-members/how-can-i-request-for-an-ipv6-prefix?lang=en",
    ),
    ("LACNIC", "https://www.lacnic.net/1016/2/lacnic/get-ip-addresses_asns"),
];

/// Build the IPv6 request message for a provider
///
/// When the provider already holds IPv6 prefixes the message cites them;
/// otherwise it points at the RIR request pages.
pub fn request_message(prefixes: &[String]) -> String {
    let (organization, request) = if prefixes.is_empty() {
        let mut request = String::from(
            "As IPv4 address space becomes increasingly scarce and expensive, implementing IPv6 \
             is essential for future growth and compatibility. I respectfully request that you \
             prioritize IPv6 deployment for your network and customer services.\n\n\
             To get started with IPv6, you can request address space from your Regional \
             Internet Registry:",
        );
        for (rir, url) in RIR_IPV6_GUIDES {
            request.push_str(&format!("\n- {}: {}", rir, url));
        }
        (
            "You currently have no IPv6 associated with your ASN. This represents a significant \
             opportunity to modernize your network infrastructure."
                .to_string(),
            request,
        )
    } else {
        (
            format!(
                "I see that you have {} registered to your organization.",
                prefixes.join(", ")
            ),
            "Because IPv4 is a legacy protocol with severely limited resources available and IPv6 \
             is the current Internet protocol as defined by the IETF, I respectfully request IPv6 \
             support for my current service offering. This would ensure compatibility with the \
             modern Internet infrastructure and provide better connectivity for your customers."
                .to_string(),
        )
    };

    format!(
        "I am a current customer of your internet service. IPv6 now results in nearly 50% of the \
         global internet traffic (see current adoption trends: {trends}), over 80% of mobile \
         traffic, and is available on all major content providers.\n\n\
         GROWTH EVIDENCE:\n\
         The growth trend is clear - IPv6 adoption has been steadily increasing over the past 5 \
         years as shown in the Global IPv6 Adoption Timeline. You can view the historical trends \
         and adoption graphs here:\n{trends}\n\n\
         Major content providers and ISPs worldwide have implemented IPv6 to future-proof their \
         networks and meet growing demand.\n\n\
         YOUR ORGANIZATION:\n{organization}\n\n\
         REQUEST:\n{request}",
        trends = ADOPTION_TRENDS_URL,
        organization = organization,
        request = request,
    )
}
