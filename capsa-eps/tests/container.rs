//! Container-to-interpreter flow over synthetic EPS files.

use capsa_eps::{EpsDocument, EpsHeader};
use capsa_postscript::{Interpreter, Object};

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn build(postscript: &[u8], wmf: &[u8], tiff: &[u8]) -> Vec<u8> {
    let ps_offset = EpsHeader::SIZE as u32;
    let wmf_offset = ps_offset + postscript.len() as u32;
    let tif_offset = wmf_offset + wmf.len() as u32;

    let mut out = Vec::new();
    push_u32(&mut out, EpsHeader::MAGIC);
    push_u32(&mut out, ps_offset);
    push_u32(&mut out, postscript.len() as u32);
    push_u32(&mut out, wmf_offset);
    push_u32(&mut out, wmf.len() as u32);
    push_u32(&mut out, tif_offset);
    push_u32(&mut out, tiff.len() as u32);
    push_u32(&mut out, 0);

    out.extend_from_slice(postscript);
    out.extend_from_slice(wmf);
    out.extend_from_slice(tiff);
    out
}

#[test]
fn embedded_program_runs_after_extraction() {
    let file = build(b"25 25 add", &[0x01, 0x02], &[0x4D, 0x4D]);
    let doc = EpsDocument::parse(&file).unwrap();

    assert_eq!(doc.wmf, [0x01, 0x02]);
    assert_eq!(doc.tiff, [0x4D, 0x4D]);

    let mut interp = Interpreter::new();
    interp.load(doc.postscript.as_bytes()).unwrap();

    assert_eq!(interp.operands(), &[Object::integer(50.0)]);
}

#[test]
fn prologue_definitions_survive_into_later_segments() {
    // A viewer feeds the extracted program to a single interpreter, so
    // definitions made early stay visible for the rest of the program.
    let program = b"/sz {25 25 add} def sz sz mul";
    let file = build(program, &[], &[]);
    let doc = EpsDocument::parse(&file).unwrap();

    let mut interp = Interpreter::new();
    interp.load(doc.postscript.as_bytes()).unwrap();

    assert_eq!(interp.operands(), &[Object::integer(2500.0)]);
}

#[test]
fn rendering_operators_bind_from_outside() {
    // Drawing operators are not part of the core; a page device registers
    // them and consumes the coordinates itself.
    fn moveto(interp: &mut Interpreter) -> capsa_postscript::Result<()> {
        interp.pop_operand()?;
        interp.pop_operand()?;
        Ok(())
    }

    let file = build(b"72 144 moveto", &[], &[]);
    let doc = EpsDocument::parse(&file).unwrap();

    let mut interp = Interpreter::new();
    interp.register("moveto", moveto);
    interp.load(doc.postscript.as_bytes()).unwrap();

    assert_eq!(interp.operands().len(), 0);
}
