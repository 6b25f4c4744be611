fn main() {
    // Embed the window icon into the Windows executable.
    #[cfg(target_os = "windows")]
    {
        let mut res = winres::WindowsResource::new();
        res.set_icon("assets/logo.ico");
        res.compile().expect("compiling the Windows icon resource");
    }
}
