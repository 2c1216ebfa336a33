//! Output rendering: hex dumps, long listings, status tables.

use grove_model::Status;

/// Hex-dumps data, sixteen bytes per row with an ASCII gutter.
/// Empty data renders as the empty string (zero rows).
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(16).enumerate() {
        let mut hex = String::with_capacity(48);
        for (i, byte) in chunk.iter().enumerate() {
            if i == 8 {
                hex.push(' ');
            }
            hex.push_str(&format!("{byte:02x} "));
        }
        let ascii: String = chunk
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<49} |{}|\n", row * 16, hex, ascii));
    }
    out
}

/// One `ls --long` row: ephemeral marker, data version, data length,
/// child count, then the name.
pub fn long_row(status: &Status, name: &str) -> String {
    let marker = if status.is_ephemeral() { 'e' } else { '-' };
    format!(
        "{} {:>5} {:>9} {:>6}  {}",
        marker, status.version, status.data_length, status.num_children, name
    )
}

/// Full `stat` listing for one node.
pub fn status_block(status: &Status) -> String {
    format!(
        "created txid: {}\n\
         modified txid: {}\n\
         child txid: {}\n\
         created: {}\n\
         modified: {}\n\
         version: {}\n\
         child version: {}\n\
         acl version: {}\n\
         ephemeral owner: {}\n\
         data length: {}\n\
         children: {}",
        status.ctxid,
        status.mtxid,
        status.ptxid,
        status.ctime_ms,
        status.mtime_ms,
        status.version,
        status.cversion,
        status.aversion,
        if status.ephemeral_owner == 0 {
            "none".to_string()
        } else {
            format!("{:#x}", status.ephemeral_owner)
        },
        status.data_length,
        status.num_children,
    )
}

/// Single-line `stat --compact` form.
pub fn status_line(status: &Status) -> String {
    format!(
        "v={} cv={} av={} len={} children={} ephemeral={}",
        status.version,
        status.cversion,
        status.aversion,
        status.data_length,
        status.num_children,
        status.is_ephemeral(),
    )
}
