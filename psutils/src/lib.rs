/// Utilitaires système partagés par les crates PowerSmart.
///
/// - [`guess_local_ip`] : devine l'adresse IP locale utilisée pour les connexions sortantes
/// - [`list_ipv4_addresses`] : adresses IPv4 non-loopback par interface
/// - [`get_os_string`] : description portable du système d'exploitation
mod ip_utils;

pub use ip_utils::{guess_local_ip, list_ipv4_addresses};

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// # Format
/// - macOS: "Macos/15.1"
/// - Linux: "Ubuntu/22.04"
/// - Windows: "Windows/10.0.19045"
/// - Autre: "{OS}/Unknown"
///
/// # Exemples
///
/// ```
/// let os = psutils::get_os_string();
/// assert!(os.contains('/'));
/// ```
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}
