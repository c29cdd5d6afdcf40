use std::path::PathBuf;
use std::process::exit;

use compiler_core::{
    change_extension, cleanup_temp_files, create_static_library, link_files, CompileOptions,
    CompilerSession, DEFAULT_ARCHIVE, DEFAULT_EXECUTABLE, MAX_LINK_ARGS,
};
use x86_backend::{OptLevel, TargetArch};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage(program_name: &str) {
    println!("Usage: {} [options] <input-files>", program_name);
    println!();
    println!("Options:");
    println!("  -o <file>          Output file name");
    println!("  -c                 Compile only (don't link)");
    println!("  -lib               Create static library (.a)");
    println!("  -O0, -O1, -O2, -Os Optimization level (0=none, 1=speed, 2=more speed, s=size)");
    println!("  -g                 Include debug information");
    println!("  -v, --verbose      Verbose output");
    println!("  -S                 Keep assembly files");
    println!("  --print-ast        Print the abstract syntax tree");
    println!("  --print-tokens     Print the token stream");
    println!("  --target <arch>    Target architecture (x86_64, arm64, riscv64)");
    println!("  -L <path>          Add library search path");
    println!("  -l<library>        Link with library");
    println!("  -h, --help         Show this help");
    println!("  --version          Show version information");
    println!();
    println!("Examples:");
    println!("  {} main.mc                      # Compile to {}", program_name, DEFAULT_EXECUTABLE);
    println!("  {} -o app main.mc util.mc       # Compile multiple files", program_name);
    println!("  {} -c main.mc                   # Compile to object file only", program_name);
    println!("  {} -lib -o libutil.a util.mc    # Create static library", program_name);
}

fn print_version() {
    println!("mica compiler v{}", VERSION);
    println!("Types: i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, void");
    println!("Target architectures: x86_64 (arm64 and riscv64 are reserved)");
}

fn parse_arguments(args: &[String]) -> CompileOptions {
    let mut opts = CompileOptions::default();
    let program_name = &args[0];

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage(program_name);
                exit(0);
            }
            "--version" => {
                print_version();
                exit(0);
            }
            "-o" => {
                i += 1;
                if i < args.len() {
                    opts.output_file = Some(PathBuf::from(&args[i]));
                }
            }
            "-c" => opts.compile_only = true,
            "-lib" => opts.create_library = true,
            "-O0" => opts.opt_level = OptLevel::None,
            "-O1" | "-O2" => opts.opt_level = OptLevel::Speed,
            "-Os" => opts.opt_level = OptLevel::Size,
            "-g" => {
                opts.debug_info = true;
                opts.opt_level = OptLevel::Debug;
            }
            "-v" | "--verbose" => opts.verbose = true,
            "-S" => opts.keep_asm = true,
            "--print-ast" => opts.print_ast = true,
            "--print-tokens" => opts.print_tokens = true,
            "--target" => {
                i += 1;
                if i < args.len() {
                    match TargetArch::from_name(&args[i]) {
                        Some(arch) => opts.arch = arch,
                        None => {
                            eprintln!("Error: Unknown target architecture: {}", args[i]);
                            exit(1);
                        }
                    }
                }
            }
            "-L" => {
                i += 1;
                if i < args.len() && opts.lib_paths.len() < MAX_LINK_ARGS {
                    opts.lib_paths.push(args[i].clone());
                }
            }
            _ if arg.starts_with("-l") => {
                if opts.libraries.len() < MAX_LINK_ARGS {
                    opts.libraries.push(arg[2..].to_string());
                }
            }
            _ if !arg.starts_with('-') => {
                opts.input_files.push(PathBuf::from(arg));
            }
            _ => {
                eprintln!("Error: Unknown option: {}", arg);
                exit(1);
            }
        }
        i += 1;
    }

    opts
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        exit(1);
    }

    let opts = parse_arguments(&args);
    if opts.input_files.is_empty() {
        eprintln!("Error: No input files specified");
        exit(1);
    }

    if opts.verbose {
        println!(
            "Target: {}, optimization: {}, {} input file(s)",
            opts.arch,
            opts.opt_level,
            opts.input_files.len()
        );
    }

    let mut session = CompilerSession::new();
    let mut obj_files: Vec<PathBuf> = Vec::new();
    let mut temp_files: Vec<PathBuf> = Vec::new();
    let mut success = true;

    for input_file in &opts.input_files {
        if opts.verbose {
            println!("Compiling {}...", input_file.display());
        }

        match session.compile_file(input_file, &opts) {
            Ok(obj_file) => {
                if !opts.keep_asm {
                    temp_files.push(change_extension(input_file, "s"));
                }
                obj_files.push(obj_file);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                success = false;
                break;
            }
        }
    }

    if success && !opts.compile_only {
        // Objects are intermediate products unless -c asked for them.
        temp_files.extend(obj_files.iter().cloned());

        if opts.create_library {
            let lib_file = opts
                .output_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE));
            if opts.verbose {
                println!("Creating library {}...", lib_file.display());
            }
            if let Err(e) = create_static_library(&obj_files, &lib_file) {
                eprintln!("Error: {}", e);
                success = false;
            }
        } else {
            let exe_file = opts
                .output_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE));
            if opts.verbose {
                println!("Linking {}...", exe_file.display());
            }
            match link_files(&obj_files, &exe_file, &opts) {
                Ok(()) => {
                    if opts.verbose {
                        println!("Run with: ./{}", exe_file.display());
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    success = false;
                }
            }
        }
    }

    if !opts.compile_only && !opts.keep_asm {
        cleanup_temp_files(&temp_files);
    }

    exit(if success { 0 } else { 1 });
}
