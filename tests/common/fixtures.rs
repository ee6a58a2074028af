//! Provider pages and torrent payloads served by the mock server

/// Bencoded stand-in for a real torrent file
pub const TORRENT_BYTES: &[u8] =
    b"d8:announce35:http://torrent.example/announce4:infod6:lengthi4194304e4:name9:image.isoee";

/// Autoindex page for a Debian `bt-dvd` directory
pub const DEBIAN_BT_DVD: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">
<html>
 <head><title>Index of /debian-cd/current/amd64/bt-dvd</title></head>
 <body>
<h1>Index of /debian-cd/current/amd64/bt-dvd</h1>
  <table>
   <tr><th><a href="?C=N;O=D">Name</a></th><th><a href="?C=M;O=A">Last modified</a></th></tr>
   <tr><td><a href="/debian-cd/current/amd64/">Parent Directory</a></td></tr>
   <tr><td><a href="debian-12.5.0-amd64-DVD-1.iso.torrent">debian-12.5.0-amd64-DVD-1.iso.torrent</a></td></tr>
   <tr><td><a href="debian-12.5.0-amd64-DVD-2.iso.torrent">debian-12.5.0-amd64-DVD-2.iso.torrent</a></td></tr>
   <tr><td><a href="SHA256SUMS">SHA256SUMS</a></td></tr>
  </table>
</body></html>"#;

/// Releng feed with a relative torrent URL
pub const ARCH_RELENG: &str = r#"{
  "version": 1,
  "latest_version": "2024.10.01",
  "releases": [
    {"version": "2024.10.01", "available": true, "torrent_url": "/releng/releases/2024.10.01/torrent/"},
    {"version": "2024.09.01", "available": true, "torrent_url": "/releng/releases/2024.09.01/torrent/"}
  ]
}"#;
