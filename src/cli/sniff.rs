use comfy_table::Table;

use crate::error::Result;
use crate::importer::sniff_import_dir;
use crate::settings::{shellexpand_path, FileType};

fn describe_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "tab".to_string(),
        b' ' => "space".to_string(),
        other => format!("'{}'", other as char),
    }
}

pub fn run(directory: &str, file_type: Option<FileType>) -> Result<()> {
    let dir = shellexpand_path(directory);
    let file_type = file_type.unwrap_or_default();
    let sniffed = sniff_import_dir(&dir, file_type)?;

    if sniffed.files.is_empty() {
        println!("No .{file_type} files in {}", dir.display());
        return Ok(());
    }

    println!("Files ({}):", sniffed.files.len());
    for file in &sniffed.files {
        println!("  {}", file.display());
    }
    if file_type == FileType::Csv {
        println!("Delimiter: {}", describe_delimiter(sniffed.delimiter));
    }
    println!("Header row: {}", if sniffed.has_header { "yes" } else { "no" });

    let mut table = Table::new();
    if sniffed.has_header {
        table.set_header(sniffed.header.clone());
    }
    for row in &sniffed.preview {
        table.add_row(row.clone());
    }
    println!("Preview\n{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_delimiter() {
        assert_eq!(describe_delimiter(b'\t'), "tab");
        assert_eq!(describe_delimiter(b';'), "';'");
    }
}
