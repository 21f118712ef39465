use crate::error::Error;
use classpatch::patch::PatchedClass;
use log::{debug, info};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Contents of every `.class` entry in a JAR
///
/// Other entries (manifests, resources) are skipped.
pub fn read_classes(path: &Path) -> Result<Vec<Vec<u8>>, Error> {
    info!("Reading {}", path.display());
    read_class_entries(File::open(path)?)
}

pub fn read_class_entries<R: Read + Seek>(reader: R) -> Result<Vec<Vec<u8>>, Error> {
    let mut archive = ZipArchive::new(reader)?;
    let mut classes = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.is_file() || !entry.name().ends_with(".class") {
            debug!("Skipping {}", entry.name());
            continue;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        classes.push(bytes);
    }
    Ok(classes)
}

/// Write each class as a deflated entry named after the class
pub fn write_classes(path: &Path, classes: &[PatchedClass]) -> Result<(), Error> {
    info!("Writing {} classes to {}", classes.len(), path.display());
    write_class_entries(File::create(path)?, classes)?;
    Ok(())
}

pub fn write_class_entries<W: Write + Seek>(
    writer: W,
    classes: &[PatchedClass],
) -> Result<W, Error> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut archive = ZipWriter::new(writer);
    for class in classes {
        let entry_name = class.entry_name();
        debug!("Writing {}", entry_name);
        archive.start_file(entry_name, options)?;
        archive.write_all(&class.bytes)?;
    }
    Ok(archive.finish()?)
}

#[cfg(test)]
mod test {
    use super::*;
    use classpatch::jvm::{BinaryName, Name};
    use std::io::Cursor;

    #[test]
    fn keeps_only_classes() {
        let classes = vec![
            PatchedClass {
                name: BinaryName::from_str("rsa/Key").unwrap(),
                bytes: vec![0xCA, 0xFE, 0xBA, 0xBE],
            },
            PatchedClass {
                name: BinaryName::from_str("client").unwrap(),
                bytes: vec![1, 2, 3],
            },
        ];
        let mut jar = write_class_entries(Cursor::new(vec![]), &classes).unwrap();

        {
            let mut archive = ZipArchive::new(&mut jar).unwrap();
            assert_eq!(archive.by_index(0).unwrap().name(), "rsa/Key.class");
            assert_eq!(
                archive.by_index(1).unwrap().compression(),
                CompressionMethod::Deflated
            );
        }

        // Append a resource, which reading must skip
        jar.set_position(0);
        let mut archive = ZipWriter::new_append(jar).unwrap();
        archive
            .start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
            .unwrap();
        archive.write_all(b"Manifest-Version: 1.0\n").unwrap();
        let jar = archive.finish().unwrap();

        let read = read_class_entries(jar).unwrap();
        assert_eq!(read, vec![vec![0xCA, 0xFE, 0xBA, 0xBE], vec![1, 2, 3]]);
    }
}
