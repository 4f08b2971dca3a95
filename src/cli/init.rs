use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};
use crate::storage::LoadMode;

pub fn run(data_dir: Option<String>, strict: bool) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    settings.load_mode = if strict {
        LoadMode::Strict
    } else {
        LoadMode::Lenient
    };

    std::fs::create_dir_all(settings.data_dir())?;
    save_settings(&settings)?;

    println!("Data directory: {}", settings.data_dir().display());
    if strict {
        println!("Strict mode: corrupt data files will be reported instead of replaced.");
    }
    Ok(())
}
