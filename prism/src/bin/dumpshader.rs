//! Reflects SPIR-V binaries and prints their resources.
//!
//! Usage: `dumpshader <file.spv>...`
//! The stage of each file is taken from its name, e.g. `quad.frag.spv`.

use std::path::Path;

use prism::{
    shader::{DescriptorLayoutMap, ShaderModel, SpirvShader, SpvResource, StageReflection},
    DeviceLimits, Leveled, ShaderStage, StageMap,
};

fn stage_of(path: &Path) -> Option<ShaderStage> {
    let name = path.file_name()?.to_str()?;
    ShaderStage::ALL
        .iter()
        .cloned()
        .find(|stage| name.contains(&format!(".{}", stage.extension())))
}

fn print_resources(title: &str, resources: &[SpvResource]) {
    for resource in resources {
        println!("  {} {}: {}", title, resource.name, resource.ty.describe());
        resource.ty.walk("", 0, &mut |name, offset, ty| {
            if !name.is_empty() {
                println!("    +{:<4} {} {}", offset, name, ty.describe());
            }
        });
    }
}

fn print_stage(reflection: &StageReflection) {
    println!("{} shader '{}'", reflection.stage, reflection.entry_point);
    for input in &reflection.inputs {
        println!("  in  {} {}: {}", input.location, input.name, input.ty.describe());
    }
    for output in &reflection.outputs {
        println!("  out {} {}: {}", output.location, output.name, output.ty.describe());
    }
    print_resources("uniform", &reflection.uniform_buffers);
    print_resources("buffer", &reflection.storage_buffers);
    print_resources("sampled", &reflection.sampled_images);
    print_resources("storage", &reflection.storage_images);
    if let Some(block) = &reflection.push_constant {
        print_resources("push", std::slice::from_ref(block));
    }
}

fn print_layout(layout: &DescriptorLayoutMap) {
    for (set, bindings) in layout.sets() {
        println!("set {}", set);
        for (binding, resource) in bindings {
            println!(
                "  binding {} {} {:?}",
                binding,
                resource.name,
                resource.stage_flags()
            );
        }
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut stages = StageMap::new();
    for arg in std::env::args().skip(1) {
        let path = Path::new(&arg);
        let stage = match stage_of(path) {
            Some(stage) => stage,
            None => {
                log::error!("Can't tell the stage of {}", path.display());
                std::process::exit(2);
            }
        };

        let reflection = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                SpirvShader::from_bytes(&bytes, stage, "main").map_err(|e| e.to_string())
            })
            .and_then(|shader| shader.reflect().map_err(|e| e.to_string()));

        match reflection {
            Ok(reflection) => {
                print_stage(&reflection);
                stages.insert(stage, reflection);
            }
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    let model = match ShaderModel::new(stages) {
        Ok(model) => model,
        Err(e) => {
            e.log();
            std::process::exit(1);
        }
    };
    print_layout(model.layout());

    if let Err(errors) = model.link(&DeviceLimits::default()) {
        for error in errors.errors() {
            error.log();
        }
        std::process::exit(1);
    }
}
