use super::{
    dead_math, key_replacement, method_variants, opaque_predicates, platform_fix, shift_mask,
    Error, PatchContext, Remapper, Settings, Warning,
};
use crate::jvm::model::Class;
use crate::jvm::{BinaryName, Name};
use log::{debug, info};
use std::collections::BTreeMap;

/// Classes of a batch, keyed by their name before renaming
pub type ClassMap = BTreeMap<BinaryName, Class>;

/// Rewrites applied to the whole batch
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pass {
    ShiftMask,
    PlatformFix,
    DeadMath,
    OpaquePredicates,
    KeyReplacement,
    MethodVariants,
}

impl Pass {
    /// Every pass, in the order they run
    pub const ALL: [Pass; 6] = [
        Pass::ShiftMask,
        Pass::PlatformFix,
        Pass::DeadMath,
        Pass::OpaquePredicates,
        Pass::KeyReplacement,
        Pass::MethodVariants,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pass::ShiftMask => "ShiftMask",
            Pass::PlatformFix => platform_fix::PASS,
            Pass::DeadMath => "DeadMath",
            Pass::OpaquePredicates => opaque_predicates::PASS,
            Pass::KeyReplacement => "KeyReplacement",
            Pass::MethodVariants => method_variants::PASS,
        }
    }

    pub fn run(self, classes: &mut ClassMap, ctx: &mut PatchContext) -> Result<(), Error> {
        match self {
            Pass::ShiftMask => shift_mask::mask_shifts(classes),
            Pass::PlatformFix => platform_fix::fix_platform(classes, ctx),
            Pass::DeadMath => dead_math::remove_dead_math(classes),
            Pass::OpaquePredicates => opaque_predicates::remove_opaque_predicates(classes, ctx),
            Pass::KeyReplacement => key_replacement::replace_key(classes, ctx)?,
            Pass::MethodVariants => method_variants::synthesize_variants(classes, ctx),
        }
        Ok(())
    }
}

/// Class ready to be written out
#[derive(Clone, Debug)]
pub struct PatchedClass {
    /// Name after renaming
    pub name: BinaryName,
    pub bytes: Vec<u8>,
}

impl PatchedClass {
    /// Path of the class inside a JAR
    pub fn entry_name(&self) -> String {
        format!("{}.class", self.name.as_str())
    }
}

#[derive(Debug)]
pub struct PatchOutput {
    /// Patched classes, in order of their original names
    pub classes: Vec<PatchedClass>,
    pub warnings: Vec<Warning>,
}

/// Runs the passes over a batch of classes
pub struct Patcher {
    settings: Settings,
}

impl Patcher {
    pub fn new(settings: Settings) -> Patcher {
        Patcher { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Decode, patch, check, rename, and re-encode a batch of class files
    pub fn patch<I, B>(&self, class_files: I) -> Result<PatchOutput, Error>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut ctx = PatchContext::new(&self.settings);
        let mut classes = load(class_files, &mut ctx)?;
        info!("Loaded {} classes", classes.len());

        for pass in Pass::ALL {
            debug!("Running pass {}", pass.name());
            pass.run(&mut classes, &mut ctx)?;
        }

        let classes = self.finish(classes)?;
        let warnings = ctx.into_warnings();
        info!(
            "Patched {} classes with {} warning(s)",
            classes.len(),
            warnings.len()
        );
        Ok(PatchOutput { classes, warnings })
    }

    /// Verify (if enabled), rename, and encode every class
    pub fn finish(&self, classes: ClassMap) -> Result<Vec<PatchedClass>, Error> {
        let remapper = Remapper::new(&self.settings.mappings);
        let mut patched = Vec::with_capacity(classes.len());
        for (_, mut class) in classes {
            if self.settings.verify {
                class.verify()?;
            }
            remapper.remap_class(&mut class);
            let bytes = class.encode()?;
            patched.push(PatchedClass {
                name: class.name,
                bytes,
            });
        }
        Ok(patched)
    }
}

/// Decode a batch of class files, keyed by the name each one declares
///
/// When two class files declare the same class, the later one wins.
pub fn load<I, B>(class_files: I, ctx: &mut PatchContext) -> Result<ClassMap, Error>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut classes = ClassMap::new();
    for bytes in class_files {
        let class = Class::decode(bytes.as_ref())?;
        let name = class.name.clone();
        if classes.insert(name.clone(), class).is_some() {
            ctx.warn("Load", format!("duplicate class {}, keeping the last one", name));
        }
    }
    Ok(classes)
}
