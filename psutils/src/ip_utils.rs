use get_if_addrs::get_if_addrs;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, UdpSocket};

/// Devine l'adresse IP locale de la machine.
///
/// Crée un socket UDP et le "connecte" vers `8.8.8.8:80` pour demander au
/// système quelle interface serait utilisée pour joindre Internet. Aucun
/// paquet n'est émis. Retourne `127.0.0.1` en cas d'échec.
pub fn guess_local_ip() -> String {
    outbound_ip().unwrap_or_else(|| Ipv4Addr::LOCALHOST.to_string())
}

fn outbound_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

/// Liste les adresses IPv4 non-loopback, groupées par interface.
///
/// Utilisé pour afficher au démarrage les URLs sous lesquelles le serveur est
/// joignable depuis le téléphone.
pub fn list_ipv4_addresses() -> BTreeMap<String, Vec<String>> {
    let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();

    if let Ok(interfaces) = get_if_addrs() {
        for iface in interfaces {
            let ip = iface.ip();
            if ip.is_loopback() || !ip.is_ipv4() {
                continue;
            }
            let entry = result.entry(iface.name.clone()).or_default();
            let ip = ip.to_string();
            if !entry.contains(&ip) {
                entry.push(ip);
            }
        }
    }

    result
}
