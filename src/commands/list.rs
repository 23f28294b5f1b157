//! List commands implementation

use avrisp_core::chip::{ChipRegistry, Fuse};

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in crate::programmers::available_programmers() {
        if p.aliases.is_empty() {
            println!("  {:12} - {}", p.name, p.description);
        } else {
            println!(
                "  {:12} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }
}

/// List all supported chips
pub fn list_chips() {
    println!("Supported chips:");
    println!();
    println!(
        "{:<10} {:>10} {:>10} {:>6}  {}",
        "Name", "Signature", "Flash", "Page", "Fuses (L H E Lock)"
    );
    println!("{}", "-".repeat(64));

    for chip in ChipRegistry::builtin().iter() {
        let fuses: Vec<String> = Fuse::ALL
            .iter()
            .map(|f| format!("{:02X}", chip.bits(*f)))
            .collect();
        println!(
            "{:<10} {:>10} {:>10} {:>6}  {}",
            chip.name,
            format!("1E {:04X}", chip.signature),
            format_size(chip.flash_size),
            chip.page_size,
            fuses.join(" ")
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
