use assert_cmd::Command;

fn memelang() -> Command {
    Command::cargo_bin("memelang").unwrap()
}

#[test]
fn unknown_subcommand_exits_nonzero() {
    memelang().arg("bogus").assert().failure();
}

#[test]
fn no_subcommand_exits_nonzero() {
    memelang().assert().failure();
}

#[test]
fn help_exits_zero() {
    memelang().arg("--help").assert().success();
}
