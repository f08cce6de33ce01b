use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use linux_manager::actions::execute_script;
use linux_manager::executor::{Executor, MemorySink};
use linux_manager::navigator::{Activation, MenuEntry, Navigator};

struct Project {
    _tmp: tempfile::TempDir,
    root: String,
}

fn project() -> Project {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("project");
    fs::create_dir(&root).expect("mkdir project");
    fs::write(root.join("a.sh"), "echo hi\n").expect("write a.sh");
    fs::write(root.join("b.txt"), "text\n").expect("write b.txt");
    fs::create_dir(root.join("sub")).expect("mkdir sub");
    fs::write(root.join("sub/deep.txt"), "").expect("write deep");
    let root = root.to_str().expect("utf8").to_string();
    Project { _tmp: tmp, root }
}

fn position(nav: &Navigator, label: &str) -> usize {
    nav.entries()
        .iter()
        .position(|e| e.label() == label)
        .unwrap_or_else(|| panic!("no entry {label}"))
}

#[test]
fn browse_into_sub_and_back_keeps_original_menu() {
    let p = project();
    let sink = MemorySink::default();
    let mut nav = Navigator::new(false);
    nav.populate(&p.root).expect("populate");

    let first = nav.entries().to_vec();
    let mut labels: Vec<&str> = first[..3].iter().map(MenuEntry::label).collect();
    labels.sort();
    assert_eq!(labels, vec!["a.sh", "b.txt", "sub"]);
    assert_eq!(first[3..].to_vec(), vec![MenuEntry::Back, MenuEntry::Quit]);

    let act = nav.activate(position(&nav, "sub"), &sink).expect("enter sub");
    assert_eq!(act, Activation::Entered { path: format!("{}/sub", p.root) });
    assert_eq!(nav.labels(), vec!["deep.txt", "Back", "Quit"]);

    let back = position(&nav, "Back");
    nav.activate(back, &sink).expect("back");
    assert_eq!(nav.entries(), &first[..]);
    assert_eq!(nav.current_path(), p.root);
}

#[test]
fn execute_selected_script() {
    let p = project();
    let sink = Arc::new(MemorySink::default());
    let mut nav = Navigator::new(false);
    nav.populate(&p.root).expect("populate");
    nav.activate(position(&nav, "a.sh"), sink.as_ref()).expect("open a.sh");
    assert_eq!(sink.text(), "echo hi\n");

    let selected = nav.selected_path().expect("selection").to_string();
    assert_eq!(selected, format!("{}/a.sh", p.root));

    let exec = Executor::new("sh", sink.clone());
    let report = exec.run(&execute_script(&selected).expect("commands"));
    assert_eq!(
        report.transcript,
        vec![
            format!("Command: chmod +x {selected}"),
            format!("Command: {selected}"),
            "hi".to_string(),
        ]
    );
    assert_eq!(sink.lines(), report.transcript);
}
