use crate::data::{NewExpense, HEADER};

/// Writes the header row alone, which is what an empty store looks like.
pub(crate) fn write_header<W: std::io::Write>(writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    wtr.flush()?;
    Ok(())
}

/// Basic CSV exporter for one `NewExpense`; the writer is expected to be
/// positioned after the existing rows, so no header is emitted.
pub(crate) fn write_expense<W: std::io::Write>(
    writer: W,
    expense: &NewExpense,
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.serialize(expense)?;
    wtr.flush()?;
    Ok(())
}

/// Dumps raw rows back out, header included if it is part of `rows`. The bytes
/// go out untouched, whatever their encoding.
pub(crate) fn write_rows<W: std::io::Write>(
    writer: W,
    rows: &[csv::ByteRecord],
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for row in rows {
        wtr.write_byte_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
