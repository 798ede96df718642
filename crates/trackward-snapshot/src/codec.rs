//! Binary encode/decode for world records.
//!
//! All integers are little-endian. Sequences are prefixed with a `u32`
//! count; optional values with a `u8` presence flag. No compression and
//! no self-describing schema.

use std::io::{Read, Write};

use trackward_core::{
    Direction, OutOfControlCause, PlatformId, SectionId, SignalId, SpeedLimit, StationId, TickId,
    TrainClass, TrainId,
};

use crate::error::SnapshotError;
use crate::types::*;
use crate::{FORMAT_VERSION, MAGIC};

/// Upper bound on any decoded sequence length.
const MAX_SEQUENCE: u32 = 1 << 24;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), SnapshotError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), SnapshotError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), SnapshotError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), SnapshotError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_bool(w: &mut dyn Write, v: bool) -> Result<(), SnapshotError> {
    write_u8(w, v as u8)
}

fn write_len(w: &mut dyn Write, len: usize) -> Result<(), SnapshotError> {
    write_u32_le(w, len as u32)
}

fn write_opt<T>(
    w: &mut dyn Write,
    v: Option<T>,
    f: impl FnOnce(&mut dyn Write, T) -> Result<(), SnapshotError>,
) -> Result<(), SnapshotError> {
    match v {
        Some(v) => {
            write_u8(w, 1)?;
            f(w, v)
        }
        None => write_u8(w, 0),
    }
}

fn write_direction(w: &mut dyn Write, d: Direction) -> Result<(), SnapshotError> {
    write_u8(w, d.index() as u8)
}

fn write_limit(w: &mut dyn Write, l: SpeedLimit) -> Result<(), SnapshotError> {
    write_f64_le(w, l.passenger_mps)?;
    write_f64_le(w, l.freight_mps)
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, SnapshotError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, SnapshotError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, SnapshotError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, SnapshotError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_bool(r: &mut dyn Read, field: &'static str) -> Result<bool, SnapshotError> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        tag => Err(SnapshotError::InvalidTag { field, tag }),
    }
}

fn read_len(r: &mut dyn Read, field: &'static str) -> Result<usize, SnapshotError> {
    let len = read_u32_le(r)?;
    if len > MAX_SEQUENCE {
        return Err(SnapshotError::LengthOverflow { field, len });
    }
    Ok(len as usize)
}

fn read_opt<T>(
    r: &mut dyn Read,
    field: &'static str,
    f: impl FnOnce(&mut dyn Read) -> Result<T, SnapshotError>,
) -> Result<Option<T>, SnapshotError> {
    if read_bool(r, field)? {
        f(r).map(Some)
    } else {
        Ok(None)
    }
}

fn read_vec<T>(
    r: &mut dyn Read,
    field: &'static str,
    mut f: impl FnMut(&mut dyn Read) -> Result<T, SnapshotError>,
) -> Result<Vec<T>, SnapshotError> {
    let len = read_len(r, field)?;
    let mut out = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        out.push(f(&mut *r)?);
    }
    Ok(out)
}

fn read_direction(r: &mut dyn Read) -> Result<Direction, SnapshotError> {
    match read_u8(r)? {
        0 => Ok(Direction::Ahead),
        1 => Ok(Direction::Reverse),
        tag => Err(SnapshotError::InvalidTag {
            field: "direction",
            tag,
        }),
    }
}

fn read_limit(r: &mut dyn Read) -> Result<SpeedLimit, SnapshotError> {
    Ok(SpeedLimit {
        passenger_mps: read_f64_le(r)?,
        freight_mps: read_f64_le(r)?,
    })
}

fn read_train_id(r: &mut dyn Read) -> Result<TrainId, SnapshotError> {
    read_u32_le(r).map(TrainId)
}

fn read_section_id(r: &mut dyn Read) -> Result<SectionId, SnapshotError> {
    read_u32_le(r).map(SectionId)
}

// ── World ───────────────────────────────────────────────────────

/// Encode `world` with header.
pub fn encode_world(w: &mut dyn Write, world: &WorldRecord) -> Result<(), SnapshotError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_u64_le(w, world.tick.0)?;
    write_bool(w, world.traps_dirty)?;

    write_len(w, world.trains.len())?;
    for t in &world.trains {
        encode_train(w, t)?;
    }
    write_len(w, world.sections.len())?;
    for s in &world.sections {
        encode_section(w, s)?;
    }
    write_len(w, world.signals.len())?;
    for s in &world.signals {
        encode_signal(w, s)?;
    }
    Ok(())
}

/// Decode and validate a world written by [`encode_world`].
pub fn decode_world(r: &mut dyn Read) -> Result<WorldRecord, SnapshotError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SnapshotError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion { found: version });
    }
    Ok(WorldRecord {
        tick: TickId(read_u64_le(r)?),
        traps_dirty: read_bool(r, "traps_dirty")?,
        trains: read_vec(r, "trains", decode_train)?,
        sections: read_vec(r, "sections", decode_section)?,
        signals: read_vec(r, "signals", decode_signal)?,
    })
}

/// Encode `world` into a fresh buffer.
pub fn to_bytes(world: &WorldRecord) -> Result<Vec<u8>, SnapshotError> {
    let mut buf = Vec::new();
    encode_world(&mut buf, world)?;
    Ok(buf)
}

/// Decode a world from a byte slice.
pub fn from_bytes(mut bytes: &[u8]) -> Result<WorldRecord, SnapshotError> {
    decode_world(&mut bytes)
}

// ── Sections and signals ────────────────────────────────────────

fn encode_section(w: &mut dyn Write, s: &SectionRecord) -> Result<(), SnapshotError> {
    write_len(w, s.occupancy.len())?;
    for (t, d) in &s.occupancy {
        write_u32_le(w, t.0)?;
        write_direction(w, *d)?;
    }
    write_opt(w, s.reservation, |w, (t, d)| {
        write_u32_le(w, t.0)?;
        write_direction(w, d)
    })?;
    write_len(w, s.claims.len())?;
    for c in &s.claims {
        write_u32_le(w, c.0)?;
    }
    write_len(w, s.traps.len())?;
    for t in &s.traps {
        write_u32_le(w, t.train.0)?;
        write_u32_le(w, t.awaited_train.0)?;
        write_u32_le(w, t.awaited_section.0)?;
    }
    write_u8(w, s.alignment)
}

fn decode_section(r: &mut dyn Read) -> Result<SectionRecord, SnapshotError> {
    Ok(SectionRecord {
        occupancy: read_vec(r, "occupancy", |r| Ok((read_train_id(r)?, read_direction(r)?)))?,
        reservation: read_opt(r, "reservation", |r| {
            Ok((read_train_id(r)?, read_direction(r)?))
        })?,
        claims: read_vec(r, "claims", read_train_id)?,
        traps: read_vec(r, "traps", |r| {
            Ok(TrapRecord {
                train: read_train_id(r)?,
                awaited_train: read_train_id(r)?,
                awaited_section: read_section_id(r)?,
            })
        })?,
        alignment: read_u8(r)?,
    })
}

fn encode_signal(w: &mut dyn Write, s: &SignalRecord) -> Result<(), SnapshotError> {
    write_u8(w, s.aspect)?;
    write_opt(w, s.enabled_for, |w, t| write_u32_le(w, t.0))?;
    write_bool(w, s.held)?;
    write_opt(w, s.permission_for, |w, t| write_u32_le(w, t.0))?;
    write_len(w, s.governed.len())?;
    for g in &s.governed {
        write_u32_le(w, g.0)?;
    }
    write_opt(w, s.next_signal, |w, s| write_u32_le(w, s.0))
}

fn decode_signal(r: &mut dyn Read) -> Result<SignalRecord, SnapshotError> {
    Ok(SignalRecord {
        aspect: read_u8(r)?,
        enabled_for: read_opt(r, "enabled_for", read_train_id)?,
        held: read_bool(r, "held")?,
        permission_for: read_opt(r, "permission_for", read_train_id)?,
        governed: read_vec(r, "governed", read_section_id)?,
        next_signal: read_opt(r, "next_signal", |r| read_u32_le(r).map(SignalId))?,
    })
}

// ── Trains ──────────────────────────────────────────────────────

fn encode_elements(w: &mut dyn Write, elements: &[ElementRecord]) -> Result<(), SnapshotError> {
    write_len(w, elements.len())?;
    for e in elements {
        write_u32_le(w, e.section.0)?;
        write_direction(w, e.direction)?;
    }
    Ok(())
}

fn decode_elements(r: &mut dyn Read) -> Result<Vec<ElementRecord>, SnapshotError> {
    read_vec(r, "route", |r| {
        Ok(ElementRecord {
            section: read_section_id(r)?,
            direction: read_direction(r)?,
        })
    })
}

fn encode_position(w: &mut dyn Write, p: &PositionRecord) -> Result<(), SnapshotError> {
    write_u32_le(w, p.section.0)?;
    write_f64_le(w, p.offset_m)?;
    write_direction(w, p.direction)?;
    write_u32_le(w, p.route_index)
}

fn decode_position(r: &mut dyn Read) -> Result<PositionRecord, SnapshotError> {
    Ok(PositionRecord {
        section: read_section_id(r)?,
        offset_m: read_f64_le(r)?,
        direction: read_direction(r)?,
        route_index: read_u32_le(r)?,
    })
}

fn encode_control(w: &mut dyn Write, c: &ControlRecord) -> Result<(), SnapshotError> {
    write_u8(w, c.mode)?;
    write_u8(w, c.previous)?;
    write_opt(w, c.cause, |w, c| write_u8(w, c.tag()))?;
    for i in 0..2 {
        encode_elements(w, &c.routes[i])?;
        write_u32_le(w, c.last_reserved[i])?;
        write_u8(w, c.authority[i].kind)?;
        write_f64_le(w, c.authority[i].distance_m)?;
    }
    Ok(())
}

fn decode_control(r: &mut dyn Read) -> Result<ControlRecord, SnapshotError> {
    let mode = read_u8(r)?;
    let previous = read_u8(r)?;
    let cause = read_opt(r, "cause", |r| {
        let tag = read_u8(r)?;
        OutOfControlCause::from_tag(tag).ok_or(SnapshotError::InvalidTag {
            field: "cause",
            tag,
        })
    })?;
    let mut control = ControlRecord {
        mode,
        previous,
        cause,
        ..ControlRecord::default()
    };
    for i in 0..2 {
        control.routes[i] = decode_elements(r)?;
        control.last_reserved[i] = read_u32_le(r)?;
        control.authority[i] = AuthorityRecord {
            kind: read_u8(r)?,
            distance_m: read_f64_le(r)?,
        };
    }
    Ok(control)
}

fn encode_speed(w: &mut dyn Write, s: &SpeedRecord) -> Result<(), SnapshotError> {
    for l in [
        s.signal,
        s.standing,
        s.previous_standing,
        s.temporary,
        s.previous_temporary,
    ] {
        write_opt(w, l, write_limit)?;
    }
    write_u8(w, s.last_passed)?;
    write_len(w, s.pending.len())?;
    for p in &s.pending {
        write_u8(w, p.target)?;
        write_bool(w, p.reset)?;
        write_limit(w, p.limit)?;
        write_f64_le(w, p.remaining_m)?;
    }
    Ok(())
}

fn decode_speed(r: &mut dyn Read) -> Result<SpeedRecord, SnapshotError> {
    Ok(SpeedRecord {
        signal: read_opt(r, "signal limit", read_limit)?,
        standing: read_opt(r, "standing limit", read_limit)?,
        previous_standing: read_opt(r, "previous standing limit", read_limit)?,
        temporary: read_opt(r, "temporary limit", read_limit)?,
        previous_temporary: read_opt(r, "previous temporary limit", read_limit)?,
        last_passed: read_u8(r)?,
        pending: read_vec(r, "pending", |r| {
            Ok(PendingRecord {
                target: read_u8(r)?,
                reset: read_bool(r, "pending reset")?,
                limit: read_limit(r)?,
                remaining_m: read_f64_le(r)?,
            })
        })?,
    })
}

fn encode_lookahead(w: &mut dyn Write, l: &LookaheadRecord) -> Result<(), SnapshotError> {
    write_len(w, l.items.len())?;
    for i in &l.items {
        write_u8(w, i.kind)?;
        write_u32_le(w, i.object)?;
        write_u32_le(w, i.route_index)?;
        write_f64_le(w, i.offset_m)?;
        write_f64_le(w, i.distance_m)?;
        write_f64_le(w, i.gap_m)?;
        write_u8(w, i.aspect)?;
    }
    write_opt(w, l.scanned, |w, (idx, off)| {
        write_u32_le(w, idx)?;
        write_f64_le(w, off)
    })
}

fn decode_lookahead(r: &mut dyn Read) -> Result<LookaheadRecord, SnapshotError> {
    Ok(LookaheadRecord {
        items: read_vec(r, "lookahead", |r| {
            Ok(ItemRecord {
                kind: read_u8(r)?,
                object: read_u32_le(r)?,
                route_index: read_u32_le(r)?,
                offset_m: read_f64_le(r)?,
                distance_m: read_f64_le(r)?,
                gap_m: read_f64_le(r)?,
                aspect: read_u8(r)?,
            })
        })?,
        scanned: read_opt(r, "scanned", |r| Ok((read_u32_le(r)?, read_f64_le(r)?)))?,
    })
}

fn encode_path(w: &mut dyn Write, p: &PathRecord) -> Result<(), SnapshotError> {
    write_len(w, p.subpaths.len())?;
    for s in &p.subpaths {
        encode_elements(w, s)?;
    }
    write_len(w, p.alternatives.len())?;
    for a in &p.alternatives {
        write_u8(w, a.kind)?;
        write_u32_le(w, a.key)?;
        encode_elements(w, &a.route)?;
    }
    write_len(w, p.stops.len())?;
    for s in &p.stops {
        write_u32_le(w, s.subpath)?;
        write_u32_le(w, s.station.0)?;
        write_u32_le(w, s.platform.0)?;
        write_u32_le(w, s.section.0)?;
    }
    Ok(())
}

fn decode_path(r: &mut dyn Read) -> Result<PathRecord, SnapshotError> {
    Ok(PathRecord {
        subpaths: read_vec(r, "subpaths", decode_elements)?,
        alternatives: read_vec(r, "alternatives", |r| {
            Ok(AlternativeRecord {
                kind: read_u8(r)?,
                key: read_u32_le(r)?,
                route: decode_elements(r)?,
            })
        })?,
        stops: read_vec(r, "stops", |r| {
            Ok(StopRecord {
                subpath: read_u32_le(r)?,
                station: StationId(read_u32_le(r)?),
                platform: PlatformId(read_u32_le(r)?),
                section: read_section_id(r)?,
            })
        })?,
    })
}

fn encode_train(w: &mut dyn Write, t: &TrainRecord) -> Result<(), SnapshotError> {
    write_u32_le(w, t.id.0)?;
    write_u8(
        w,
        match t.class {
            TrainClass::Passenger => 0,
            TrainClass::Freight => 1,
        },
    )?;
    write_f64_le(w, t.length_m)?;
    write_f64_le(w, t.max_speed_mps)?;
    write_f64_le(w, t.speed_mps)?;
    write_u32_le(w, t.subpath)?;
    write_opt(w, t.path.as_ref(), encode_path)?;
    encode_position(w, &t.front)?;
    encode_position(w, &t.rear)?;
    encode_control(w, &t.control)?;
    encode_speed(w, &t.speed)?;
    encode_lookahead(w, &t.lookahead)?;
    write_f64_le(w, t.blocked_s)?;
    write_f64_le(w, t.deadlock_wait_s)?;
    write_bool(w, t.brake_applied)
}

fn decode_train(r: &mut dyn Read) -> Result<TrainRecord, SnapshotError> {
    let id = read_train_id(r)?;
    let class = match read_u8(r)? {
        0 => TrainClass::Passenger,
        1 => TrainClass::Freight,
        tag => return Err(SnapshotError::InvalidTag { field: "class", tag }),
    };
    Ok(TrainRecord {
        id,
        class,
        length_m: read_f64_le(r)?,
        max_speed_mps: read_f64_le(r)?,
        speed_mps: read_f64_le(r)?,
        subpath: read_u32_le(r)?,
        path: read_opt(r, "path", decode_path)?,
        front: decode_position(r)?,
        rear: decode_position(r)?,
        control: decode_control(r)?,
        speed: decode_speed(r)?,
        lookahead: decode_lookahead(r)?,
        blocked_s: read_f64_le(r)?,
        deadlock_wait_s: read_f64_le(r)?,
        brake_applied: read_bool(r, "brake_applied")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rejects_wrong_magic() {
        let bytes = b"MURK\x01";
        match from_bytes(bytes) {
            Err(SnapshotError::InvalidMagic) => {}
            other => panic!("expected InvalidMagic, got {other:?}"),
        }
    }

    #[test]
    fn header_rejects_future_version() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(FORMAT_VERSION + 1);
        match from_bytes(&bytes) {
            Err(SnapshotError::UnsupportedVersion { found }) => {
                assert_eq!(found, FORMAT_VERSION + 1)
            }
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn truncated_input_is_io_error() {
        let world = WorldRecord {
            tick: TickId(3),
            sections: vec![SectionRecord::default(); 2],
            ..WorldRecord::default()
        };
        let bytes = to_bytes(&world).expect("encode");
        match from_bytes(&bytes[..bytes.len() - 1]) {
            Err(SnapshotError::Io(_)) => {}
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn bad_direction_tag_is_reported() {
        let world = WorldRecord {
            sections: vec![SectionRecord {
                occupancy: vec![(TrainId(1), Direction::Ahead)],
                ..SectionRecord::default()
            }],
            ..WorldRecord::default()
        };
        let mut bytes = to_bytes(&world).expect("encode");
        // header(5) + tick(8) + flag(1) + trains(4) + sections(4) + occupancy(4) + train(4)
        bytes[30] = 7;
        match from_bytes(&bytes) {
            Err(SnapshotError::InvalidTag { field: "direction", tag: 7 }) => {}
            other => panic!("expected InvalidTag, got {other:?}"),
        }
    }

    #[test]
    fn oversized_sequence_is_rejected() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        match from_bytes(&bytes) {
            Err(SnapshotError::LengthOverflow { field: "trains", .. }) => {}
            other => panic!("expected LengthOverflow, got {other:?}"),
        }
    }
}
