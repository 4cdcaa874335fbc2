//! Lua scripts for the compare-then-write steps that must be atomic in Redis

use redis::Script;

/// Overwrite hash fields only if the hash still exists (keeps its TTL).
///
/// KEYS[1] = snapshot hash, ARGV = field, value, field, value, ...
const PATCH_IF_EXISTS: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], unpack(ARGV))
return 1
";

/// Add or re-score a dirty member with a strictly increasing score, and drop
/// members not re-marked within the TTL.
///
/// KEYS[1] = dirty zset, ARGV[1] = report id, ARGV[2] = now (ms), ARGV[3] = ttl (s)
const MARK_DIRTY: &str = r"
local score = tonumber(ARGV[2])
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', '(' .. (score - tonumber(ARGV[3]) * 1000))
local current = redis.call('ZSCORE', KEYS[1], ARGV[1])
if current and tonumber(current) >= score then
    score = tonumber(current) + 1
end
redis.call('ZADD', KEYS[1], score, ARGV[1])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return score
";

/// Remove a dirty member only if it was not re-marked since it was read.
///
/// KEYS[1] = dirty zset, ARGV[1] = report id, ARGV[2] = score seen at drain
const CLEAR_DIRTY: &str = r"
local current = redis.call('ZSCORE', KEYS[1], ARGV[1])
if current and tonumber(current) == tonumber(ARGV[2]) then
    return redis.call('ZREM', KEYS[1], ARGV[1])
end
return 0
";

/// Write one `flag:version` reaction field unless the stored field carries
/// the same or a later version.
///
/// KEYS[1] = reaction hash, KEYS[2] = reaction users set,
/// ARGV[1] = kind field, ARGV[2] = flag, ARGV[3] = version, ARGV[4] = user id,
/// ARGV[5] = ttl (s)
const SET_FLAG_IF_NEWER: &str = r"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if current then
    local seen = tonumber(string.match(current, ':(%-?%d+)$'))
    if seen and seen >= tonumber(ARGV[3]) then
        return 0
    end
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2] .. ':' .. ARGV[3])
redis.call('EXPIRE', KEYS[1], ARGV[5])
redis.call('SADD', KEYS[2], ARGV[4])
redis.call('EXPIRE', KEYS[2], ARGV[5])
return 1
";

/// Set only the reaction fields that are missing.
///
/// KEYS[1] = reaction hash, ARGV[1] = ttl (s), ARGV[2..] = field, value, ...
const FILL_ABSENT: &str = r"
for i = 2, #ARGV, 2 do
    redis.call('HSETNX', KEYS[1], ARGV[i], ARGV[i + 1])
end
redis.call('EXPIRE', KEYS[1], ARGV[1])
return 1
";

/// Delete a lock key only while it still holds our owner token.
///
/// KEYS[1] = lock key, ARGV[1] = owner token
const RELEASE_LOCK: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

pub(crate) fn patch_if_exists() -> Script {
    Script::new(PATCH_IF_EXISTS)
}

pub(crate) fn mark_dirty() -> Script {
    Script::new(MARK_DIRTY)
}

pub(crate) fn clear_dirty() -> Script {
    Script::new(CLEAR_DIRTY)
}

pub(crate) fn set_flag_if_newer() -> Script {
    Script::new(SET_FLAG_IF_NEWER)
}

pub(crate) fn fill_absent() -> Script {
    Script::new(FILL_ABSENT)
}

pub(crate) fn release_lock() -> Script {
    Script::new(RELEASE_LOCK)
}
